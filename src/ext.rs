use anyhow::{anyhow, Result};
use bytes::Buf;

/// Small helper extension over `bytes::Buf` used by the inbound decoders to
/// treat buffer exhaustion as a recoverable decode failure instead of a
/// panic.
pub(crate) trait BufExt: Buf {
    fn read_u8(&mut self) -> Result<u8>;
}

impl<T: Buf> BufExt for T {
    fn read_u8(&mut self) -> Result<u8> {
        if self.remaining() < 1 {
            return Err(anyhow!("buffer exhausted reading u8"));
        }
        Ok(self.get_u8())
    }
}
