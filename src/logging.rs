//! Tracing subscriber setup

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Build the filter from config. `RUST_LOG` wins when set.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Initialize the global subscriber. Call once at startup.
///
/// Logs go to stderr so command output on stdout stays clean.
pub fn init(config: &LoggingConfig) {
    let filter = env_filter(config);

    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    };

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}
