//! Subscriber loop: consume, decode, handle, commit.
//!
//! Mirrors the sink side of the service: each message is decoded through
//! the rawjson codec, handed to the [`MessageHandler`], retried with
//! backoff on transient failures, and routed to the dead-letter topic
//! when it cannot be processed. An offset is stored only after the
//! handler succeeds or the message lands on the dead-letter topic, so
//! processing is at-least-once and a failed dead-letter publish stops
//! the loop instead of dropping the message.

use crate::options;
use crate::publisher::Publisher;
use async_trait::async_trait;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{Headers, Message};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use svckit_core::{
    AdapterError, AdapterResult, BrokerConfig, BrokerMetrics, Envelope, RawJsonCodec, RequestId,
    RetryConfig, RetryStrategy,
};
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

/// Processes decoded envelopes from the subscribed topic.
#[async_trait]
pub trait MessageHandler: Send {
    async fn handle(&mut self, envelope: Envelope) -> AdapterResult<()>;
}

/// Dead-letter destination for messages that cannot be processed.
struct DeadLetter {
    publisher: Publisher,
    topic: String,
}

/// Consumer loop wrapping a [`StreamConsumer`].
pub struct Subscriber<H: MessageHandler> {
    consumer: StreamConsumer,
    handler: H,
    codec: RawJsonCodec,
    topic: String,
    appname: String,
    metrics: BrokerMetrics,
    retry_strategy: RetryStrategy,
    dead_letter: Option<DeadLetter>,
    shutdown: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
}

impl<H: MessageHandler> Subscriber<H> {
    /// Create a subscriber for `topic`.
    ///
    /// When `broker.error_topic` is configured, a dead-letter publisher
    /// is created alongside the consumer.
    pub fn new(
        config: &BrokerConfig,
        topic: &str,
        appname: &str,
        handler: H,
    ) -> AdapterResult<Self> {
        config.validate()?;

        if config.reader.group.is_empty() {
            return Err(AdapterError::config(
                "broker.reader.group is required for subscribers",
            ));
        }

        let consumer: StreamConsumer = options::consumer_config(config)
            .create()
            .map_err(|e| AdapterError::fatal_with_source("failed to create Kafka consumer", e))?;

        let dead_letter = match &config.error_topic {
            Some(error_topic) => Some(DeadLetter {
                publisher: Publisher::new(config)?,
                topic: error_topic.clone(),
            }),
            None => None,
        };

        let retry_strategy = RetryStrategy::new(RetryConfig::new(
            config.max_retries,
            config.retry_backoff_ms,
            config.max_backoff_ms,
        ));

        Ok(Self {
            consumer,
            handler,
            codec: RawJsonCodec::new(),
            topic: topic.to_string(),
            appname: appname.to_string(),
            metrics: BrokerMetrics::new(appname, topic),
            retry_strategy,
            dead_letter,
            shutdown: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
        })
    }

    /// Request a graceful stop from another task.
    pub fn shutdown_handle(&self) -> impl Fn() + Send + Sync + 'static {
        let flag = self.shutdown.clone();
        let notify = self.shutdown_notify.clone();
        move || {
            flag.store(true, Ordering::Relaxed);
            notify.notify_waiters();
        }
    }

    /// Run the consume loop until ctrl-c or [`Subscriber::shutdown_handle`].
    pub async fn run(&mut self) -> AdapterResult<()> {
        info!(topic = %self.topic, "starting subscriber");

        // Shutdown on ctrl-c
        let flag = self.shutdown.clone();
        let notify = self.shutdown_notify.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received shutdown signal");
                flag.store(true, Ordering::Relaxed);
                notify.notify_waiters();
            }
        });

        self.consumer
            .subscribe(&[&self.topic])
            .map_err(|e| AdapterError::fatal_with_source("failed to subscribe to topic", e))?;
        info!(topic = %self.topic, "consumer subscribed");

        self.metrics.set_health(true);

        while !self.shutdown.load(Ordering::Relaxed) {
            let message = tokio::select! {
                _ = self.shutdown_notify.notified() => break,
                result = self.consumer.recv() => match result {
                    Ok(message) => message.detach(),
                    Err(e) => {
                        error!("consumer receive error: {}", e);
                        self.metrics.record_error("Receive");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                },
            };

            self.metrics.record_received();

            let payload = message.payload().unwrap_or_default().to_vec();
            let record_headers = extract_headers(&message);

            let outcome = match self.codec.decode(&payload) {
                Ok(mut envelope) => {
                    // Record headers win only where the envelope has none.
                    for (key, value) in &record_headers {
                        if !envelope.has_header(key) {
                            envelope.set_header(key.clone(), value.clone());
                        }
                    }

                    let request_id = RequestId::ensure(&envelope);
                    let span = svckit_core::logging::request_span(&request_id);
                    self.handle_decoded(envelope, &record_headers, &payload, message.offset())
                        .instrument(span)
                        .await
                }
                Err(e) => {
                    warn!("skipping undecodable message: {}", e);
                    self.metrics.record_error(error_kind(&e));
                    self.to_dead_letter(&record_headers, &payload, &e).await
                }
            };

            match outcome {
                // Processed or dead-lettered; move past the offset.
                Ok(true) => {
                    if let Err(e) = self.consumer.store_offset(
                        message.topic(),
                        message.partition(),
                        message.offset(),
                    ) {
                        error!("failed to store offset: {}", e);
                    }
                }
                // Not dealt with; leave the offset so the message is redelivered.
                Ok(false) => {}
                // Dead-letter topic unreachable: stop before the offset is lost.
                Err(e) => {
                    error!("stopping subscriber: {}", e);
                    self.metrics.set_health(false);
                    return Err(e);
                }
            }
        }

        info!("subscriber stopped");
        self.metrics.set_health(false);
        Ok(())
    }

    /// Handle one decoded envelope.
    ///
    /// `Ok(true)` means the offset may be stored (handled or
    /// dead-lettered), `Ok(false)` means the message was not dealt with
    /// and must stay uncommitted for redelivery.
    async fn handle_decoded(
        &mut self,
        envelope: Envelope,
        record_headers: &std::collections::HashMap<String, String>,
        payload: &[u8],
        offset: i64,
    ) -> AdapterResult<bool> {
        debug!(topic = %self.topic, offset, "processing message");

        match self.process_with_retry(envelope).await {
            Ok(()) => {
                self.metrics.record_success();
                Ok(true)
            }
            Err(e) => {
                error!("failed to process message: {}", e);
                self.metrics.record_error(error_kind(&e));
                self.to_dead_letter(record_headers, payload, &e).await
            }
        }
    }

    /// Process one envelope, retrying transient failures with backoff.
    async fn process_with_retry(&mut self, envelope: Envelope) -> AdapterResult<()> {
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            match self.handler.handle(envelope.clone()).await {
                Ok(()) => {
                    self.metrics.record_processing_time(start.elapsed());
                    return Ok(());
                }
                Err(e) if e.is_retryable() && self.retry_strategy.should_retry(attempt) => {
                    attempt += 1;
                    self.metrics.record_retry();

                    let backoff = self.retry_strategy.calculate_backoff(attempt);
                    warn!("retry attempt {} after {:?}: {}", attempt, backoff, e);
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Republish a broken message to the dead-letter topic, raw body
    /// unchanged, with the failure and origin recorded in headers.
    ///
    /// `Ok(true)` when the message was republished, `Ok(false)` when no
    /// dead-letter topic is configured. A failed republish is fatal: the
    /// message would otherwise be lost once its offset is committed.
    async fn to_dead_letter(
        &self,
        record_headers: &std::collections::HashMap<String, String>,
        payload: &[u8],
        cause: &AdapterError,
    ) -> AdapterResult<bool> {
        let Some(dead_letter) = &self.dead_letter else {
            warn!("no dead-letter topic configured, leaving message for redelivery");
            return Ok(false);
        };

        let mut header = record_headers.clone();
        header.insert("error".to_string(), cause.to_string());
        header.insert("appname".to_string(), self.appname.clone());
        header.insert("Content-Type".to_string(), "application/json".to_string());

        match dead_letter
            .publisher
            .publish_raw(&dead_letter.topic, &header, payload)
            .await
        {
            Ok(()) => {
                self.metrics.record_dead_lettered();
                Ok(true)
            }
            Err(e) => Err(AdapterError::fatal_with_source(
                format!("cannot publish to dead-letter topic {}", dead_letter.topic),
                e,
            )),
        }
    }
}

fn extract_headers(message: &rdkafka::message::OwnedMessage) -> std::collections::HashMap<String, String> {
    let mut map = std::collections::HashMap::new();
    if let Some(headers) = message.headers() {
        for header in headers.iter() {
            if let Some(value) = header.value {
                if let Ok(value) = std::str::from_utf8(value) {
                    map.insert(header.key.to_string(), value.to_string());
                }
            }
        }
    }
    map
}

fn error_kind(e: &AdapterError) -> &'static str {
    match e {
        AdapterError::Config(_) => "Config",
        AdapterError::Codec(_) => "Codec",
        AdapterError::Serialization(_) => "Serialization",
        AdapterError::InvalidData { .. } => "InvalidData",
        AdapterError::Retryable { .. } => "Retryable",
        AdapterError::Fatal { .. } => "Fatal",
    }
}
