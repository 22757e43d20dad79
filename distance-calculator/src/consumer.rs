//! The pull loop turning telemetry into distance samples.
//!
//! Messages are handled one at a time, in the order the source yields them.
//! A message that cannot be decoded, measured or forwarded is logged, counted
//! and acknowledged anyway: the loop never stops on a bad message and never
//! retries one. Samples are forwarded as they are, duplicates included.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use aggregator::client::AggregatorClient;
use tokio_util::sync::CancellationToken;
use toll_common::time::TimeSource;
use toll_common::types::{DistanceSample, TelemetryEvent};
use tracing::{debug, error, info, warn};

use crate::calculator::CalculatorService;
use crate::source::{Delivery, SourceError, TelemetrySource};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Processed,
    DecodeFailure,
    CalculationFailure,
    ClientFailure,
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Outcome::Processed => "processed",
            Outcome::DecodeFailure => "decode_failure",
            Outcome::CalculationFailure => "calculation_failure",
            Outcome::ClientFailure => "client_failure",
        }
    }
}

/// Counters of the consumer, readable while it runs.
#[derive(Default, Debug)]
pub struct ConsumerStats {
    running: AtomicBool,
    received: AtomicU64,
    processed: AtomicU64,
    decode_failures: AtomicU64,
    calculation_failures: AtomicU64,
    client_failures: AtomicU64,
    source_errors: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub received: u64,
    pub processed: u64,
    pub decode_failures: u64,
    pub calculation_failures: u64,
    pub client_failures: u64,
    pub source_errors: u64,
}

impl ConsumerStats {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::SeqCst),
            processed: self.processed.load(Ordering::SeqCst),
            decode_failures: self.decode_failures.load(Ordering::SeqCst),
            calculation_failures: self.calculation_failures.load(Ordering::SeqCst),
            client_failures: self.client_failures.load(Ordering::SeqCst),
            source_errors: self.source_errors.load(Ordering::SeqCst),
        }
    }

    fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Processed => &self.processed,
            Outcome::DecodeFailure => &self.decode_failures,
            Outcome::CalculationFailure => &self.calculation_failures,
            Outcome::ClientFailure => &self.client_failures,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        metrics::counter!("distance_calculator_messages_total", "outcome" => outcome.as_str())
            .increment(1);
    }
}

pub struct Consumer<T> {
    source: Arc<dyn TelemetrySource>,
    calculator: Arc<dyn CalculatorService>,
    client: Arc<dyn AggregatorClient>,
    clock: T,
    stats: Arc<ConsumerStats>,
}

impl<T: TimeSource + Send + Sync> Consumer<T> {
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        calculator: Arc<dyn CalculatorService>,
        client: Arc<dyn AggregatorClient>,
        clock: T,
    ) -> Self {
        Self {
            source,
            calculator,
            client,
            clock,
            stats: Arc::new(ConsumerStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ConsumerStats> {
        self.stats.clone()
    }

    /// Pull and handle messages until `shutdown` is cancelled. A message being
    /// handled when that happens is finished first; the source is closed on the
    /// way out.
    ///
    /// Returns `Err(SourceError::Closed)` if the source ends by itself.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), SourceError> {
        self.stats.running.store(true, Ordering::SeqCst);
        info!("distance calculator consumer started");

        let result = loop {
            let delivery = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break Ok(()),
                delivery = self.source.recv() => delivery,
            };

            match delivery {
                Ok(delivery) => self.handle(delivery).await,
                Err(SourceError::Closed) => break Err(SourceError::Closed),
                Err(err) => {
                    self.stats.source_errors.fetch_add(1, Ordering::SeqCst);
                    error!("failed to receive telemetry: {}", err);
                }
            }
        };

        self.source.close().await;
        self.stats.running.store(false, Ordering::SeqCst);
        info!(stats = ?self.stats.snapshot(), "distance calculator consumer stopped");

        result
    }

    async fn handle(&self, delivery: Delivery) {
        self.stats.received.fetch_add(1, Ordering::SeqCst);

        let outcome = self.process(&delivery.payload).await;
        self.stats.record(outcome);

        if let Err(err) = delivery.ack() {
            warn!("failed to acknowledge telemetry: {}", err);
        }
    }

    async fn process(&self, payload: &[u8]) -> Outcome {
        let event: TelemetryEvent = match serde_json::from_slice(payload) {
            Ok(event) => event,
            Err(err) => {
                warn!("skipping undecodable telemetry: {}", err);
                return Outcome::DecodeFailure;
            }
        };

        let distance = match self.calculator.calculate_distance(&event) {
            Ok(distance) => distance,
            Err(err) => {
                warn!(obu_id = event.obu_id, "skipping telemetry: {}", err);
                return Outcome::CalculationFailure;
            }
        };

        let sample = DistanceSample::new(
            event.obu_id,
            distance,
            self.clock.unix_nanos(),
            event.request_id,
        );

        match self.client.aggregate(&sample).await {
            Ok(()) => {
                debug!(obu_id = sample.obu_id, distance, "forwarded distance");
                Outcome::Processed
            }
            Err(err) => {
                error!(obu_id = sample.obu_id, "aggregate client failure: {}", err);
                Outcome::ClientFailure
            }
        }
    }
}
