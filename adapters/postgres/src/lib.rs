//! # svckit Postgres adapter
//!
//! Pool assembly from the shared [`PostgresConfig`](svckit_core::PostgresConfig)
//! plus a metrics-instrumented [`Store`] wrapper.
//!
//! ```rust,no_run
//! use svckit_core::{AppConfig, AdapterError, SqlLabels};
//! use svckit_postgres::{connect, Store};
//!
//! #[tokio::main]
//! async fn main() -> svckit_core::AdapterResult<()> {
//!     let config = AppConfig::load()?;
//!     let pg = config.postgres.as_ref().ok_or_else(|| {
//!         AdapterError::config("postgres section is required")
//!     })?;
//!
//!     let pool = connect(pg).await?;
//!     let store = Store::new(
//!         pool,
//!         SqlLabels {
//!             db_host: pg.addr.clone(),
//!             db_name: pg.dbname.clone(),
//!             service: config.server.name.clone(),
//!             version: config.server.version.clone(),
//!             id: config.server.id.clone(),
//!         },
//!     );
//!     store.start_stats_collector();
//!
//!     let row = store
//!         .fetch_one("select_now", sqlx::query("SELECT now()"))
//!         .await
//!         .map_err(|e| AdapterError::fatal_with_source("query failed", e))?;
//!     drop(row);
//!     Ok(())
//! }
//! ```

mod connect;
mod store;

pub use connect::{build_options, connect, dsn_redacted};
pub use store::{Store, StoreTx};
