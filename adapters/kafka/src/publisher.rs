//! Envelope publisher.

use crate::options;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::collections::HashMap;
use std::time::Duration;
use svckit_core::{
    AdapterError, AdapterResult, BrokerConfig, ClientConfig, Envelope, RawJsonCodec, RequestId,
};
use tracing::debug;

const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishes envelopes to Kafka topics through the rawjson codec.
///
/// Envelope headers are duplicated onto Kafka record headers so brokers
/// and consumers that do not decode the body still see the metadata.
/// An `x-request-id` header is guaranteed before every send.
pub struct Publisher {
    producer: FutureProducer,
    codec: RawJsonCodec,
    send_timeout: Duration,
}

impl Publisher {
    pub fn new(config: &BrokerConfig) -> AdapterResult<Self> {
        Self::build(config, DEFAULT_SEND_TIMEOUT)
    }

    /// Publisher with outbound call behaviour from [`ClientConfig`]:
    /// the per-send timeout follows `client.request_timeout`.
    pub fn with_client(config: &BrokerConfig, client: &ClientConfig) -> AdapterResult<Self> {
        Self::build(config, client.request_timeout())
    }

    fn build(config: &BrokerConfig, send_timeout: Duration) -> AdapterResult<Self> {
        config.validate()?;

        let producer: FutureProducer = options::producer_config(config)
            .create()
            .map_err(|e| AdapterError::fatal_with_source("failed to create Kafka producer", e))?;

        Ok(Self {
            producer,
            codec: RawJsonCodec::new(),
            send_timeout,
        })
    }

    /// Publish one envelope, encoding it into the wire format.
    pub async fn publish(&self, topic: &str, mut envelope: Envelope) -> AdapterResult<()> {
        let request_id = RequestId::ensure(&envelope);
        request_id.inject(&mut envelope);

        let payload = self.codec.encode(&envelope)?;
        self.send(topic, &envelope.header, &payload).await?;

        debug!(topic, request_id = %request_id, size = payload.len(), "message published");
        Ok(())
    }

    /// Publish raw bytes without envelope processing.
    ///
    /// Used by the dead-letter path, which must forward broken payloads
    /// unchanged.
    pub async fn publish_raw(
        &self,
        topic: &str,
        header: &HashMap<String, String>,
        body: &[u8],
    ) -> AdapterResult<()> {
        self.send(topic, header, body).await
    }

    async fn send(
        &self,
        topic: &str,
        header: &HashMap<String, String>,
        payload: &[u8],
    ) -> AdapterResult<()> {
        let mut headers = OwnedHeaders::new_with_capacity(header.len());
        for (key, value) in header {
            headers = headers.insert(Header {
                key,
                value: Some(value.as_bytes()),
            });
        }

        let record = FutureRecord::<(), _>::to(topic)
            .payload(payload)
            .headers(headers);

        self.producer
            .send(record, self.send_timeout)
            .await
            .map_err(|(e, _)| {
                AdapterError::retryable_with_source(format!("failed to publish to {}", topic), e)
            })?;

        Ok(())
    }
}
