//! Structured logging initialization.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber once at startup.
///
/// `RUST_LOG` wins over the configured level so operators can raise
/// verbosity without touching the config file.
pub fn init(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("fleet_api={default_level},tower_http={default_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
