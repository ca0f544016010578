//! Metrics for broker and SQL instrumentation.
//!
//! Built on the `metrics` facade; the Prometheus scrape endpoint is
//! served by [`install_exporter`] when a metrics address is configured.

use crate::config::MetricsConfig;
use crate::{AdapterError, AdapterResult};
use metrics::{counter, gauge, histogram, Label};
use std::net::SocketAddr;
use std::time::Duration;

// Broker-side metric names.
pub const MESSAGES_RECEIVED: &str = "broker_messages_received_total";
pub const MESSAGES_PROCESSED: &str = "broker_messages_processed_total";
pub const MESSAGES_FAILED: &str = "broker_messages_failed_total";
pub const MESSAGES_RETRIED: &str = "broker_messages_retried_total";
pub const MESSAGES_DEAD_LETTERED: &str = "broker_messages_dead_lettered_total";
pub const PROCESSING_DURATION: &str = "broker_processing_duration_seconds";
pub const SUBSCRIBER_HEALTH: &str = "broker_subscriber_health";

// SQL client metric names.
pub const SQL_REQUESTS: &str = "sql_client_requests_total";
pub const SQL_DURATION: &str = "sql_client_request_duration_seconds";
pub const SQL_POOL_MAX: &str = "sql_client_pool_max_connections";
pub const SQL_POOL_OPEN: &str = "sql_client_pool_open_connections";
pub const SQL_POOL_IDLE: &str = "sql_client_pool_idle_connections";

/// Start the Prometheus scrape endpoint on the configured address.
///
/// An empty address disables the exporter, which keeps tests and tools
/// that do not scrape from binding a port.
pub fn install_exporter(config: &MetricsConfig) -> AdapterResult<()> {
    if config.addr.is_empty() {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| AdapterError::config(format!("invalid metrics.addr {}: {}", config.addr, e)))?;

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| AdapterError::fatal_with_source("failed to install metrics exporter", e))
}

/// Per-service broker counters and timings.
#[derive(Debug, Clone)]
pub struct BrokerMetrics {
    service: String,
    topic: String,
}

impl BrokerMetrics {
    pub fn new(service: &str, topic: &str) -> Self {
        Self {
            service: service.to_string(),
            topic: topic.to_string(),
        }
    }

    fn labels(&self) -> Vec<Label> {
        vec![
            Label::new("service", self.service.clone()),
            Label::new("topic", self.topic.clone()),
        ]
    }

    pub fn record_received(&self) {
        counter!(MESSAGES_RECEIVED, self.labels()).increment(1);
    }

    pub fn record_success(&self) {
        counter!(MESSAGES_PROCESSED, self.labels()).increment(1);
    }

    pub fn record_error(&self, kind: &str) {
        counter!(
            MESSAGES_FAILED,
            "service" => self.service.clone(),
            "topic" => self.topic.clone(),
            "error" => kind.to_string()
        )
        .increment(1);
    }

    pub fn record_retry(&self) {
        counter!(MESSAGES_RETRIED, self.labels()).increment(1);
    }

    pub fn record_dead_lettered(&self) {
        counter!(MESSAGES_DEAD_LETTERED, self.labels()).increment(1);
    }

    pub fn record_processing_time(&self, duration: Duration) {
        histogram!(PROCESSING_DURATION, self.labels()).record(duration.as_secs_f64());
    }

    pub fn set_health(&self, healthy: bool) {
        gauge!(SUBSCRIBER_HEALTH, self.labels()).set(if healthy { 1.0 } else { 0.0 });
    }
}

/// Identifying labels for SQL client metrics.
#[derive(Debug, Clone, Default)]
pub struct SqlLabels {
    pub db_host: String,
    pub db_name: String,
    pub service: String,
    pub version: String,
    pub id: String,
}

impl SqlLabels {
    fn base(&self) -> Vec<Label> {
        vec![
            Label::new("dbhost", self.db_host.clone()),
            Label::new("dbname", self.db_name.clone()),
            Label::new("service", self.service.clone()),
            Label::new("version", self.version.clone()),
            Label::new("id", self.id.clone()),
        ]
    }

    /// Record one query: latency histogram plus a status-partitioned counter.
    pub fn observe_query(&self, query: &str, duration: Duration, success: bool) {
        let status = if success { "success" } else { "failure" };

        histogram!(
            SQL_DURATION,
            "dbhost" => self.db_host.clone(),
            "dbname" => self.db_name.clone(),
            "service" => self.service.clone(),
            "version" => self.version.clone(),
            "id" => self.id.clone(),
            "query" => query.to_string()
        )
        .record(duration.as_secs_f64());

        counter!(
            SQL_REQUESTS,
            "dbhost" => self.db_host.clone(),
            "dbname" => self.db_name.clone(),
            "service" => self.service.clone(),
            "version" => self.version.clone(),
            "id" => self.id.clone(),
            "query" => query.to_string(),
            "status" => status
        )
        .increment(1);
    }

    /// Copy pool counters into gauges.
    pub fn set_pool_stats(&self, max: u32, open: u32, idle: u32) {
        gauge!(SQL_POOL_MAX, self.base()).set(max as f64);
        gauge!(SQL_POOL_OPEN, self.base()).set(open as f64);
        gauge!(SQL_POOL_IDLE, self.base()).set(idle as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_metrics_do_not_panic_without_recorder() {
        let metrics = BrokerMetrics::new("svc", "events");
        metrics.record_received();
        metrics.record_success();
        metrics.record_error("Codec");
        metrics.record_retry();
        metrics.record_dead_lettered();
        metrics.record_processing_time(Duration::from_millis(3));
        metrics.set_health(true);
    }

    #[test]
    fn test_sql_labels_observe() {
        let labels = SqlLabels {
            db_host: "db:5432".into(),
            db_name: "payments".into(),
            service: "svc".into(),
            version: "1.0".into(),
            id: "node-1".into(),
        };
        labels.observe_query("insert_payment", Duration::from_millis(12), true);
        labels.observe_query("insert_payment", Duration::from_millis(12), false);
        labels.set_pool_stats(10, 4, 2);
    }

    #[test]
    fn test_exporter_disabled_on_empty_addr() {
        assert!(install_exporter(&MetricsConfig::default()).is_ok());
    }

    #[test]
    fn test_exporter_rejects_bad_addr() {
        let config = MetricsConfig {
            addr: "not-an-addr".into(),
        };
        assert!(install_exporter(&config).is_err());
    }
}
