//! Structured logging setup and request-id correlation.

use crate::config::LoggerConfig;
use crate::request_id::RequestId;
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing from the logger configuration.
///
/// `RUST_LOG` wins when set; otherwise the configured level is used.
/// Safe to call more than once, later calls are no-ops.
pub fn init_tracing(config: &LoggerConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .ok();
}

/// Span carrying the request id, so every log line emitted while the
/// span is entered is correlated with the originating request.
pub fn request_span(id: &RequestId) -> Span {
    tracing::info_span!("request", request_id = %id)
}
