//! Network endpoint abstraction (§4.c): one local-bound + one remote-bound
//! socket pair, with live address reassignment and a single-slot "latest
//! datagram wins" receive mailbox.
//!
//! Grounded on the teacher's `ds::conn::udp_conn`/`tcp_conn` socket
//! lifecycle (bind, spawn a reader, `tokio::select!` against a signal
//! channel), generalized into a reusable type shared by all four endpoints
//! (FMS, radio, robot, netconsole) instead of one hand-written function per
//! protocol.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use bytes::{Bytes, BytesMut};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::Result;

const MAX_DATAGRAM: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp,
}

/// Static description of one endpoint, supplied by the installed protocol.
#[derive(Debug, Clone, Copy)]
pub struct EndpointTemplate {
    pub local_port: u16,
    pub remote_port: u16,
    pub transport: Transport,
    pub broadcast: bool,
}

enum Inner {
    Udp {
        socket: Arc<UdpSocket>,
        reader: JoinHandle<()>,
    },
    Tcp {
        writer: UnboundedSender<Bytes>,
        reader: JoinHandle<()>,
    },
}

impl Inner {
    fn abort(&self) {
        match self {
            Inner::Udp { reader, .. } => reader.abort(),
            Inner::Tcp { reader, .. } => reader.abort(),
        }
    }
}

/// One local-bound + remote-bound socket pair. An endpoint with an empty
/// remote host (`disabled() == true`) is a no-op for every operation.
pub struct Endpoint {
    template: EndpointTemplate,
    remote_host: String,
    inner: Option<Inner>,
    recv_slot: Arc<StdMutex<Option<Bytes>>>,
}

impl Endpoint {
    pub fn new(template: EndpointTemplate) -> Endpoint {
        Endpoint {
            template,
            remote_host: String::new(),
            inner: None,
            recv_slot: Arc::new(StdMutex::new(None)),
        }
    }

    /// An endpoint is disabled (a no-op) when it has no remote host, which
    /// the fallback "zero address" (§3 Endpoint) represents.
    pub fn disabled(&self) -> bool {
        self.remote_host.is_empty()
    }

    pub fn remote_host(&self) -> &str {
        &self.remote_host
    }

    /// Binds/connects the endpoint. Never blocks the engine loop: UDP binds
    /// are effectively instantaneous and TCP connects are raced against a
    /// timeout equal to the caller-supplied watchdog period.
    pub async fn open(&mut self, timeout: std::time::Duration) -> Result<()> {
        self.close().await;

        if self.disabled() {
            return Ok(());
        }

        match self.template.transport {
            Transport::Udp => self.open_udp().await,
            Transport::Tcp => self.open_tcp(timeout).await,
        }
    }

    async fn open_udp(&mut self) -> Result<()> {
        let socket = UdpSocket::bind(("0.0.0.0", self.template.local_port)).await?;
        if self.template.broadcast {
            socket.set_broadcast(true)?;
        }
        let socket = Arc::new(socket);

        let recv_slot = self.recv_slot.clone();
        let reader_socket = socket.clone();
        let reader = tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                match reader_socket.recv_from(&mut buf).await {
                    Ok((n, _addr)) => {
                        let bytes = Bytes::copy_from_slice(&buf[..n]);
                        *recv_slot.lock().unwrap() = Some(bytes);
                    }
                    Err(_) => break,
                }
            }
        });

        self.inner = Some(Inner::Udp { socket, reader });
        Ok(())
    }

    async fn open_tcp(&mut self, timeout: std::time::Duration) -> Result<()> {
        let target = format!("{}:{}", self.remote_host, self.template.remote_port);
        let stream = tokio::time::timeout(timeout, TcpStream::connect(&target)).await??;
        let (mut read_half, mut write_half) = stream.into_split();

        let recv_slot = self.recv_slot.clone();
        let reader = tokio::spawn(async move {
            use tokio::io::AsyncReadExt;
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                match read_half.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let bytes = Bytes::copy_from_slice(&buf[..n]);
                        *recv_slot.lock().unwrap() = Some(bytes);
                    }
                }
            }
        });

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Bytes>();
        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            while let Some(bytes) = rx.recv().await {
                if write_half.write_all(&bytes).await.is_err() {
                    break;
                }
            }
        });

        self.inner = Some(Inner::Tcp { writer: tx, reader });
        Ok(())
    }

    /// Stops the listener and clears the receive slot. A no-op if the
    /// endpoint was never opened.
    pub async fn close(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.abort();
        }
        *self.recv_slot.lock().unwrap() = None;
    }

    /// Replaces the remote host and reopens the endpoint (close-then-open,
    /// serialized on this method so in-flight sends never race the close).
    pub async fn set_address(&mut self, host: &str, timeout: std::time::Duration) -> Result<()> {
        self.remote_host = host.to_string();
        self.open(timeout).await
    }

    /// Writes `bytes` to the remote peer. Returns the number of bytes
    /// written, or `-1` on failure/disabled-endpoint.
    pub async fn send(&self, bytes: &[u8]) -> i64 {
        if self.disabled() {
            return -1;
        }

        match &self.inner {
            Some(Inner::Udp { socket, .. }) => {
                let target = format!("{}:{}", self.remote_host, self.template.remote_port);
                match socket.send_to(bytes, target).await {
                    Ok(n) => n as i64,
                    Err(_) => -1,
                }
            }
            Some(Inner::Tcp { writer, .. }) => {
                let payload = Bytes::copy_from_slice(bytes);
                let len = payload.len();
                if writer.send(payload).is_ok() {
                    len as i64
                } else {
                    -1
                }
            }
            None => -1,
        }
    }

    /// Returns the most recently received buffer, clearing the slot.
    /// Empty if nothing has arrived since the last call.
    pub fn recv(&self) -> Bytes {
        self.recv_slot
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Bytes::from(BytesMut::new().freeze()))
    }

    pub fn local_port(&self) -> u16 {
        self.template.local_port
    }

    pub fn remote_addr_string(&self) -> String {
        format!("{}:{}", self.remote_host, self.template.remote_port)
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.abort();
        }
    }
}
