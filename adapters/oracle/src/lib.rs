//! # svckit Oracle adapter
//!
//! Session-pool assembly from the shared
//! [`OracleConfig`](svckit_core::OracleConfig). The driver is
//! synchronous; async callers run statements through
//! `tokio::task::spawn_blocking`.
//!
//! ```rust,no_run
//! use svckit_core::{AppConfig, AdapterError};
//!
//! fn main() -> svckit_core::AdapterResult<()> {
//!     let config = AppConfig::load()?;
//!     let ora = config.oracle.as_ref().ok_or_else(|| {
//!         AdapterError::config("oracle section is required")
//!     })?;
//!
//!     let pool = svckit_oracle::connect(ora)?;
//!     let conn = pool
//!         .get()
//!         .map_err(|e| AdapterError::fatal_with_source("checkout failed", e))?;
//!     drop(conn);
//!     Ok(())
//! }
//! ```

use oracle::pool::{Pool, PoolBuilder};
use svckit_core::{AdapterError, AdapterResult, OracleConfig};
use tracing::info;

/// EZCONNECT descriptor for the configured server and service.
pub fn dsn(cfg: &OracleConfig) -> String {
    format!("{}/{}", cfg.addr, cfg.dbname)
}

/// Log-safe connection string with the password masked.
pub fn dsn_redacted(cfg: &OracleConfig) -> String {
    format!("{}/***@{}/{}", cfg.login, cfg.addr, cfg.dbname)
}

/// Build a session pool using the configured limits.
pub fn connect(cfg: &OracleConfig) -> AdapterResult<Pool> {
    let connect_string = dsn(cfg);

    info!(dsn = %dsn_redacted(cfg), "connecting to oracle");

    let mut builder = PoolBuilder::new(&cfg.login, &cfg.passw, &connect_string);
    if cfg.conn_max > 0 {
        builder.max_connections(cfg.conn_max);
    }
    if cfg.conn_max_idle > 0 {
        builder.min_connections(cfg.conn_max_idle);
    }

    builder
        .build()
        .map_err(|e| AdapterError::fatal_with_source("failed to create oracle pool", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OracleConfig {
        OracleConfig {
            addr: "ora.internal:1521".into(),
            login: "svc".into(),
            passw: "secret".into(),
            dbname: "ORCLPDB1".into(),
            conn_max: 10,
            conn_max_idle: 2,
        }
    }

    #[test]
    fn test_dsn_format() {
        assert_eq!(dsn(&config()), "ora.internal:1521/ORCLPDB1");
    }

    #[test]
    fn test_dsn_redacted_hides_password() {
        let dsn = dsn_redacted(&config());
        assert_eq!(dsn, "svc/***@ora.internal:1521/ORCLPDB1");
        assert!(!dsn.contains("secret"));
    }
}
