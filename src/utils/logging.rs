use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::EnvFilter;

static ENABLE_LOGGING: AtomicBool = AtomicBool::new(false);

/// Initializes logging based on environment variables:
/// - LEDGERBENCH_LOGGING: enables/disables logging (true/false, default false)
/// - LEDGERBENCH_LOG_FILTER: tracing filter directive (default "info")
///
/// Safe to call more than once; only the first call installs the subscriber.
/// To enable logging in tests, run: LEDGERBENCH_LOGGING=true cargo test -- --nocapture
pub fn init_logging() {
    let enabled = match env::var("LEDGERBENCH_LOGGING") {
        Ok(value) => match value.as_str() {
            "true" => true,
            "false" => false,
            other => {
                eprintln!(
                    "LEDGERBENCH_LOGGING must be 'true' or 'false' (got '{}'), logging stays disabled",
                    other
                );
                false
            }
        },
        Err(_) => false,
    };
    ENABLE_LOGGING.store(enabled, Ordering::SeqCst);
    if !enabled {
        return;
    }

    let filter = env::var("LEDGERBENCH_LOG_FILTER").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info"));
    // Fails when a subscriber is already installed, which is fine.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

pub fn is_enabled() -> bool {
    ENABLE_LOGGING.load(Ordering::SeqCst)
}

/// Emits a `[prefix] message` progress line when logging is enabled.
pub fn log(prefix: &str, message: &str) {
    if is_enabled() {
        tracing::info!("[{}]   {}", prefix, message);
    }
}
