//! Stamps the build time as seconds-since-epoch so `station::build_date`/
//! `build_time` can report it without a dedicated build-info crate (the
//! original C library gets this for free from `__DATE__`/`__TIME__`).

fn main() {
    let epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    println!("cargo:rustc-env=DS_BUILD_EPOCH_SECS={}", epoch);
}
