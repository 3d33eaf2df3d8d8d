use std::sync::{Mutex, MutexGuard};

/// Serializes tests that read or write `MEDIA_DIGEST_*` environment variables.
static ENV: Mutex<()> = Mutex::new(());

pub fn lock_env() -> MutexGuard<'static, ()> {
    ENV.lock().unwrap_or_else(|poison| poison.into_inner())
}
