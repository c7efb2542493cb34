//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// Uses `default_filter` unless `RUST_LOG` is set in the environment.
pub fn init(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    // A second init (tests, embedding hosts) keeps the first logger.
    let _ = env_logger::Builder::from_env(env).try_init();
}
