//! # svckit Kafka adapter
//!
//! Binds a service to Kafka through `rdkafka`, configured from the
//! shared [`BrokerConfig`](svckit_core::BrokerConfig):
//!
//! - [`Publisher`]: encodes [`Envelope`](svckit_core::Envelope)s through
//!   the rawjson codec and guarantees request-id propagation;
//! - [`Subscriber`]: consume loop with decode, retry with backoff,
//!   dead-letter republishing, and at-least-once offset handling;
//! - [`options`]: the `BrokerConfig` → librdkafka property translation.
//!
//! ```rust,no_run
//! use svckit_core::{AppConfig, AdapterResult, Envelope};
//! use svckit_kafka::{MessageHandler, Subscriber};
//! use async_trait::async_trait;
//!
//! struct PaymentHandler;
//!
//! #[async_trait]
//! impl MessageHandler for PaymentHandler {
//!     async fn handle(&mut self, envelope: Envelope) -> AdapterResult<()> {
//!         tracing::info!("got {} bytes", envelope.size());
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> AdapterResult<()> {
//!     let config = AppConfig::load()?;
//!     let mut subscriber =
//!         Subscriber::new(&config.broker, "payments", &config.server.name, PaymentHandler)?;
//!     subscriber.run().await
//! }
//! ```

pub mod options;

mod publisher;
mod subscriber;

pub use publisher::Publisher;
pub use subscriber::{MessageHandler, Subscriber};
