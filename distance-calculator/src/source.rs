//! Where telemetry comes from. Production reads a Kafka topic, tests feed an
//! in-memory channel.
//!
//! A [`Delivery`] must be acknowledged once it has been handled, successfully
//! or not. For Kafka, acknowledging stores the message offset, which the
//! client commits in the background and once more on close: anything
//! delivered but not acknowledged is redelivered after a restart.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::{ClientConfig, Message};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::config::KafkaConfig;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("kafka error: {0}")]
    Kafka(#[from] KafkaError),
    #[error("source closed")]
    Closed,
    #[error("consumer gone")]
    Gone,
}

pub trait Ack: Send {
    fn ack(self: Box<Self>) -> Result<(), SourceError>;
}

pub struct Delivery {
    pub payload: Vec<u8>,
    ack: Box<dyn Ack>,
}

impl Delivery {
    pub fn new(payload: Vec<u8>, ack: Box<dyn Ack>) -> Self {
        Self { payload, ack }
    }

    pub fn ack(self) -> Result<(), SourceError> {
        self.ack.ack()
    }
}

#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Wait for the next message. Cancel safe.
    async fn recv(&self) -> Result<Delivery, SourceError>;

    /// Flush acknowledgements and leave the queue.
    async fn close(&self);
}

#[derive(Clone)]
pub struct KafkaSource {
    inner: Arc<Inner>,
}

struct Inner {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaSource {
    pub fn new(config: &KafkaConfig) -> Result<Self, KafkaError> {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &config.kafka_hosts)
            .set("statistics.interval.ms", "10000")
            .set("group.id", &config.kafka_consumer_group)
            .set("auto.offset.reset", &config.kafka_consumer_offset_reset)
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", "1000");

        client_config.set("enable.auto.offset.store", "false");

        if config.kafka_tls {
            client_config
                .set("security.protocol", "ssl")
                .set("enable.ssl.certificate.verification", "false");
        };

        let consumer: StreamConsumer = client_config.create()?;
        consumer.subscribe(&[config.kafka_topic.as_str()])?;

        let inner = Inner {
            consumer,
            topic: config.kafka_topic.clone(),
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }
}

#[async_trait]
impl TelemetrySource for KafkaSource {
    async fn recv(&self) -> Result<Delivery, SourceError> {
        let message = self.inner.consumer.recv().await?;

        let offset = Offset {
            handle: Arc::downgrade(&self.inner),
            partition: message.partition(),
            offset: message.offset(),
        };
        // Empty payloads are passed on and fail decoding like any other poison pill.
        let payload = message.payload().unwrap_or_default().to_vec();

        Ok(Delivery::new(payload, Box::new(offset)))
    }

    async fn close(&self) {
        let inner = self.inner.clone();
        // Both calls block on the broker.
        let closed = tokio::task::spawn_blocking(move || {
            if let Err(err) = inner.consumer.commit_consumer_state(CommitMode::Sync) {
                // Nothing stored since the last auto commit.
                warn!("final offset commit failed: {}", err);
            }
            inner.consumer.unsubscribe();
        })
        .await;

        if closed.is_err() {
            warn!("kafka source close panicked");
        }
        info!(topic = self.inner.topic, "kafka source closed");
    }
}

struct Offset {
    handle: Weak<Inner>,
    partition: i32,
    offset: i64,
}

impl Ack for Offset {
    fn ack(self: Box<Self>) -> Result<(), SourceError> {
        let inner = self.handle.upgrade().ok_or(SourceError::Gone)?;
        inner
            .consumer
            .store_offset(&inner.topic, self.partition, self.offset)?;
        Ok(())
    }
}

/// In-memory source fed through a channel. Closing the sender ends the source.
pub struct ChannelSource {
    receiver: Mutex<mpsc::Receiver<Vec<u8>>>,
    acked: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl ChannelSource {
    pub fn new(capacity: usize) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        let source = Self {
            receiver: Mutex::new(receiver),
            acked: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
        };
        (sender, source)
    }

    /// Number of deliveries acknowledged so far.
    pub fn acked(&self) -> Arc<AtomicUsize> {
        self.acked.clone()
    }

    /// Number of times the source was closed.
    pub fn closed(&self) -> Arc<AtomicUsize> {
        self.closed.clone()
    }
}

struct CountingAck(Arc<AtomicUsize>);

impl Ack for CountingAck {
    fn ack(self: Box<Self>) -> Result<(), SourceError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl TelemetrySource for ChannelSource {
    async fn recv(&self) -> Result<Delivery, SourceError> {
        let payload = self
            .receiver
            .lock()
            .await
            .recv()
            .await
            .ok_or(SourceError::Closed)?;

        Ok(Delivery::new(
            payload,
            Box::new(CountingAck(self.acked.clone())),
        ))
    }

    async fn close(&self) {
        self.receiver.lock().await.close();
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
