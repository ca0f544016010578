//! Translation from [`BrokerConfig`] to librdkafka client properties.

use rdkafka::config::ClientConfig;
use svckit_core::BrokerConfig;

const DEFAULT_FETCH_MAX_WAIT_MS: u64 = 1000;
const DEFAULT_COMMIT_INTERVAL_MS: u64 = 1000;
const DEFAULT_MAX_BUFFERED_RECORDS: u32 = 1000;
const DEFAULT_BATCH_BYTES: u32 = 1024 * 1024;

fn base_config(cfg: &BrokerConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client.set("bootstrap.servers", cfg.addrs.join(","));

    if !cfg.client_id.is_empty() {
        client.set("client.id", &cfg.client_id);
    }

    if let (Some(username), Some(password)) = (&cfg.username, &cfg.password) {
        client
            .set("security.protocol", "sasl_plaintext")
            .set("sasl.mechanism", "PLAIN")
            .set("sasl.username", username)
            .set("sasl.password", password);
    }

    client
}

/// Producer properties: leader acks, no compression, bounded buffering,
/// batch size and linger from the writer section.
pub fn producer_config(cfg: &BrokerConfig) -> ClientConfig {
    let mut client = base_config(cfg);

    client
        .set("acks", "1")
        .set("compression.type", "none")
        .set(
            "queue.buffering.max.messages",
            pick(cfg.writer.max_buffered_records, DEFAULT_MAX_BUFFERED_RECORDS).to_string(),
        )
        .set(
            "batch.size",
            pick(cfg.writer.batch_bytes, DEFAULT_BATCH_BYTES).to_string(),
        );

    if cfg.writer.batch_timeout_ms > 0 {
        client.set("linger.ms", cfg.writer.batch_timeout_ms.to_string());
    }

    client
}

/// Consumer properties: group, fetch tuning, periodic commits of
/// explicitly stored offsets (at-least-once).
pub fn consumer_config(cfg: &BrokerConfig) -> ClientConfig {
    let mut client = base_config(cfg);

    client
        .set("group.id", &cfg.reader.group)
        .set("enable.auto.commit", "true")
        .set("enable.auto.offset.store", "false")
        .set(
            "auto.commit.interval.ms",
            pick64(cfg.reader.commit_interval_ms, DEFAULT_COMMIT_INTERVAL_MS).to_string(),
        )
        .set(
            "fetch.wait.max.ms",
            pick64(cfg.reader.max_wait_ms, DEFAULT_FETCH_MAX_WAIT_MS).to_string(),
        );

    if cfg.reader.min_bytes > 0 {
        client.set("fetch.min.bytes", cfg.reader.min_bytes.to_string());
    }
    if cfg.reader.max_bytes > 0 {
        client.set("fetch.max.bytes", cfg.reader.max_bytes.to_string());
    }

    client
}

fn pick(value: u32, default: u32) -> u32 {
    if value == 0 {
        default
    } else {
        value
    }
}

fn pick64(value: u64, default: u64) -> u64 {
    if value == 0 {
        default
    } else {
        value
    }
}
