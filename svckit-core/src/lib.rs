//! # svckit core
//!
//! Shared kit for the svckit service adapters.
//!
//! The adapter crates bind a service to its surroundings: Kafka
//! (`svckit-kafka`), Postgres (`svckit-postgres`), Oracle
//! (`svckit-oracle`), and HTTP (`svckit-rest`). This crate holds what
//! they have in common:
//!
//! - the broker message [`Envelope`] and its wire codec [`RawJsonCodec`]
//! - aggregated service configuration ([`AppConfig`]) with TOML + env loading
//! - request-id propagation ([`RequestId`]) and tracing setup
//! - metrics names and recorders shared by the adapters
//! - the retry policy used by the broker processing loop
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use svckit_core::{AppConfig, logging, metrics};
//!
//! fn main() -> svckit_core::AdapterResult<()> {
//!     let config = AppConfig::load()?;
//!     config.validate()?;
//!
//!     logging::init_tracing(&config.logger);
//!     metrics::install_exporter(&config.metrics)?;
//!     Ok(())
//! }
//! ```

mod codec;
mod config;
mod envelope;
mod error;
mod request_id;
mod retry;

pub mod logging;
pub mod metrics;

// Re-export public API
pub use codec::RawJsonCodec;
pub use config::{
    AppConfig, BrokerConfig, ClientConfig, LoggerConfig, MetricsConfig, OracleConfig,
    PostgresConfig, ReaderConfig, ServerConfig, WriterConfig,
};
pub use envelope::{
    Envelope, CONTENT_TYPE_BYTES_PLAIN, CONTENT_TYPE_GRPC_PROTO, CONTENT_TYPE_HEADER,
};
pub use error::{AdapterError, AdapterResult};
pub use metrics::{BrokerMetrics, SqlLabels};
pub use request_id::{RequestId, REQUEST_ID_HEADER};
pub use retry::{RetryConfig, RetryStrategy};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
