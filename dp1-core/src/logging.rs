use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;

/// Initialize the process-wide tracing subscriber. Idempotent: a second call
/// within the same process is a no-op, since subscribers cannot be swapped
/// once set.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    if let Err(err) = result {
        eprintln!("tracing subscriber already initialized: {err}");
    }
}
