//! Test fixture utilities.

use mssql_session::Config;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, MutexGuard};
use tracing_subscriber::EnvFilter;

static FALLBACK_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Install a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Serialize tests that read or reset the process-wide fallback record.
///
/// Sessions that fail to log in report to the fallback, so tests asserting
/// on it must not overlap. The fallback is cleared when the guard is taken.
#[must_use]
pub fn fallback_guard() -> MutexGuard<'static, ()> {
    let guard = FALLBACK_LOCK.lock();
    mssql_session::reset_fallback();
    guard
}

/// A configuration for mock sessions: UTF-8 charset, fixed credentials.
#[must_use]
pub fn test_config() -> Config {
    Config::new()
        .server("mock")
        .credentials("sa", "secret")
        .charset("utf8")
}
