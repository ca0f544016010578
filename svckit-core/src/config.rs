//! Service configuration.
//!
//! One aggregated [`AppConfig`] with a section per adapter, loadable from
//! a TOML file with environment variable overrides on top.

use crate::{AdapterError, AdapterResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use uuid::Uuid;

/// Identity and listen address of the service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    /// Service name
    #[serde(default)]
    pub name: String,
    /// Instance id; generated when empty
    #[serde(default)]
    pub id: String,
    /// Service version
    #[serde(default)]
    pub version: String,
    /// Listen address (host:port)
    #[serde(default)]
    pub addr: String,
}

impl ServerConfig {
    /// Instance id, generating a fresh UUID when none is configured.
    pub fn ensure_id(&mut self) -> &str {
        if self.id.is_empty() {
            self.id = Uuid::new_v4().to_string();
        }
        &self.id
    }
}

/// Kafka reader tuning, mirrored onto consumer properties.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReaderConfig {
    /// Consumer group
    #[serde(default)]
    pub group: String,
    /// Minimum bytes per fetch
    #[serde(default)]
    pub min_bytes: u32,
    /// Maximum bytes per fetch
    #[serde(default)]
    pub max_bytes: u32,
    /// Maximum fetch wait in milliseconds
    #[serde(default)]
    pub max_wait_ms: u64,
    /// Offset commit interval in milliseconds
    #[serde(default)]
    pub commit_interval_ms: u64,
}

/// Kafka writer tuning, mirrored onto producer properties.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WriterConfig {
    /// Maximum batch size in bytes
    #[serde(default)]
    pub batch_bytes: u32,
    /// Producer linger in milliseconds
    #[serde(default)]
    pub batch_timeout_ms: u64,
    /// Upper bound on locally buffered records
    #[serde(default)]
    pub max_buffered_records: u32,
}

/// Broker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Bootstrap addresses
    #[serde(default)]
    pub addrs: Vec<String>,
    /// Kafka client id
    #[serde(default)]
    pub client_id: String,
    /// SASL PLAIN username (optional)
    #[serde(default)]
    pub username: Option<String>,
    /// SASL PLAIN password (optional)
    #[serde(default)]
    pub password: Option<String>,
    /// Dead-letter topic for broken messages (optional)
    #[serde(default)]
    pub error_topic: Option<String>,
    /// Maximum retries for a failed message
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base retry backoff in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Retry backoff cap in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default)]
    pub reader: ReaderConfig,
    #[serde(default)]
    pub writer: WriterConfig,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    30000
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            addrs: Vec::new(),
            client_id: String::new(),
            username: None,
            password: None,
            error_topic: None,
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            reader: ReaderConfig::default(),
            writer: WriterConfig::default(),
        }
    }
}

impl BrokerConfig {
    pub fn validate(&self) -> AdapterResult<()> {
        if self.addrs.is_empty() {
            return Err(AdapterError::config("broker.addrs cannot be empty"));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(AdapterError::config(
                "broker credentials require both username and password",
            ));
        }
        Ok(())
    }
}

/// Postgres connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PostgresConfig {
    /// Server address (host or host:port)
    #[serde(default)]
    pub addr: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub passw: String,
    #[serde(default)]
    pub dbname: String,
    /// Reported application name (pgbouncer friendly)
    #[serde(default)]
    pub appname: String,
    /// Maximum open connections (0 = driver default)
    #[serde(default)]
    pub conn_max: u32,
    /// Connections kept warm (0 = driver default)
    #[serde(default)]
    pub conn_max_idle: u32,
    /// Connection lifetime in seconds (0 = unlimited)
    #[serde(default)]
    pub conn_lifetime: u64,
    /// Idle timeout in seconds (0 = unlimited)
    #[serde(default)]
    pub conn_max_idle_time: u64,
}

/// Oracle connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OracleConfig {
    /// Server address (host or host:port)
    #[serde(default)]
    pub addr: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub passw: String,
    /// Service name appended to the connect descriptor
    #[serde(default)]
    pub dbname: String,
    /// Maximum pooled sessions (0 = driver default)
    #[serde(default)]
    pub conn_max: u32,
    /// Minimum pooled sessions
    #[serde(default)]
    pub conn_max_idle: u32,
}

/// Outbound client behaviour.
///
/// Consumed by the adapters when constructing outbound clients, e.g.
/// `svckit-kafka`'s `Publisher::with_client` takes the send timeout
/// from here. Zero values fall back to the documented defaults via the
/// getter methods.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientConfig {
    /// Retries per call (0 = default)
    #[serde(default)]
    pub retries: u32,
    /// Request timeout in seconds (0 = default)
    #[serde(default)]
    pub request_timeout: u64,
    /// Connection pool size (0 = default)
    #[serde(default)]
    pub pool_size: u32,
    /// Dial timeout in seconds (0 = default)
    #[serde(default)]
    pub dial_timeout: u64,
    /// Pool entry TTL in seconds (0 = default)
    #[serde(default)]
    pub pool_ttl: u64,
}

const DEFAULT_CLIENT_RETRIES: u32 = 1;
const DEFAULT_CLIENT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CLIENT_POOL_SIZE: u32 = 100;
const DEFAULT_CLIENT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CLIENT_POOL_TTL: Duration = Duration::from_secs(60);

impl ClientConfig {
    pub fn retries(&self) -> u32 {
        if self.retries == 0 {
            DEFAULT_CLIENT_RETRIES
        } else {
            self.retries
        }
    }

    pub fn request_timeout(&self) -> Duration {
        if self.request_timeout == 0 {
            DEFAULT_CLIENT_REQUEST_TIMEOUT
        } else {
            Duration::from_secs(self.request_timeout)
        }
    }

    pub fn pool_size(&self) -> u32 {
        if self.pool_size == 0 {
            DEFAULT_CLIENT_POOL_SIZE
        } else {
            self.pool_size
        }
    }

    pub fn dial_timeout(&self) -> Duration {
        if self.dial_timeout == 0 {
            DEFAULT_CLIENT_DIAL_TIMEOUT
        } else {
            Duration::from_secs(self.dial_timeout)
        }
    }

    pub fn pool_ttl(&self) -> Duration {
        if self.pool_ttl == 0 {
            DEFAULT_CLIENT_POOL_TTL
        } else {
            Duration::from_secs(self.pool_ttl)
        }
    }
}

/// Structured logger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Metrics exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricsConfig {
    /// Scrape endpoint listen address (host:port), empty disables the exporter
    #[serde(default)]
    pub addr: String,
}

/// Aggregated service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub postgres: Option<PostgresConfig>,
    #[serde(default)]
    pub oracle: Option<OracleConfig>,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logger: LoggerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> AdapterResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AdapterError::config(format!("Failed to read config file {}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            AdapterError::config(format!("Failed to parse config file {}: {}", path, e))
        })
    }

    /// Load configuration from the file named by `CONFIG_FILE`, falling
    /// back to defaults, with environment overrides applied on top.
    pub fn load() -> AdapterResult<Self> {
        let mut config = if let Ok(path) = env::var("CONFIG_FILE") {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.server.ensure_id();

        Ok(config)
    }

    /// Apply environment variable overrides to key fields.
    ///
    /// - `SERVER_NAME`, `SERVER_ID`, `SERVER_VERSION`, `SERVER_ADDRESS`
    /// - `BROKER_ADDRS` (comma separated), `BROKER_GROUP`
    /// - `METRIC_ADDRESS`
    /// - `LOG_LEVEL`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("SERVER_NAME") {
            self.server.name = val;
        }
        if let Ok(val) = env::var("SERVER_ID") {
            self.server.id = val;
        }
        if let Ok(val) = env::var("SERVER_VERSION") {
            self.server.version = val;
        }
        if let Ok(val) = env::var("SERVER_ADDRESS") {
            self.server.addr = val;
        }
        if let Ok(val) = env::var("BROKER_ADDRS") {
            self.broker.addrs = val.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(val) = env::var("BROKER_GROUP") {
            self.broker.reader.group = val;
        }
        if let Ok(val) = env::var("METRIC_ADDRESS") {
            self.metrics.addr = val;
        }
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logger.log_level = val;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> AdapterResult<()> {
        if self.server.name.is_empty() {
            return Err(AdapterError::config("server.name cannot be empty"));
        }
        if !self.broker.addrs.is_empty() {
            self.broker.validate()?;
        }
        if let Some(pg) = &self.postgres {
            if pg.addr.is_empty() || pg.dbname.is_empty() {
                return Err(AdapterError::config(
                    "postgres.addr and postgres.dbname are required",
                ));
            }
        }
        if let Some(ora) = &self.oracle {
            if ora.addr.is_empty() || ora.dbname.is_empty() {
                return Err(AdapterError::config(
                    "oracle.addr and oracle.dbname are required",
                ));
            }
        }
        Ok(())
    }
}
