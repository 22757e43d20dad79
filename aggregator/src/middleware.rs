use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use toll_common::middleware::{LogLayer, LogMiddleware, MetricsLayer, MetricsMiddleware};
use toll_common::types::{DistanceSample, Invoice};
use tower::ServiceBuilder;

use crate::service::{Aggregator, AggregatorError};

#[async_trait]
impl<S: Aggregator> Aggregator for LogMiddleware<S> {
    async fn aggregate_distance(&self, sample: DistanceSample) -> Result<(), AggregatorError> {
        let started = Instant::now();
        let (obu_id, value) = (sample.obu_id, sample.value);
        let request_id = sample.request_id.clone().unwrap_or_default();

        let result = self.inner().aggregate_distance(sample).await;
        self.record(
            "aggregate_distance",
            started,
            format_args!("obu_id={obu_id} value={value} request_id={request_id}"),
            &result,
        );
        result
    }

    async fn calculate_invoice(&self, obu_id: i64) -> Result<Invoice, AggregatorError> {
        let started = Instant::now();
        let result = self.inner().calculate_invoice(obu_id).await;
        self.record(
            "calculate_invoice",
            started,
            format_args!("obu_id={obu_id}"),
            &result,
        );
        result
    }
}

#[async_trait]
impl<S: Aggregator> Aggregator for MetricsMiddleware<S> {
    async fn aggregate_distance(&self, sample: DistanceSample) -> Result<(), AggregatorError> {
        let started = Instant::now();
        let result = self.inner().aggregate_distance(sample).await;
        self.record("aggregate_distance", started, &result);
        result
    }

    async fn calculate_invoice(&self, obu_id: i64) -> Result<Invoice, AggregatorError> {
        let started = Instant::now();
        let result = self.inner().calculate_invoice(obu_id).await;
        self.record("calculate_invoice", started, &result);
        result
    }
}

/// Wrap `service` with the metrics and logging middlewares, metrics outermost,
/// so its latency includes logging.
pub fn instrument<S>(service: S) -> Arc<dyn Aggregator>
where
    S: Aggregator + 'static,
{
    Arc::new(
        ServiceBuilder::new()
            .layer(MetricsLayer::new("aggregator"))
            .layer(LogLayer::new("aggregator"))
            .service(service),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::InvoiceAggregator;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn instrumented_service_returns_the_same_results() {
        let plain = InvoiceAggregator::new(MemoryStore::new());
        let wrapped = instrument(InvoiceAggregator::new(MemoryStore::new()));

        let samples = [
            DistanceSample::new(1, 2.0, 10, Some("a".to_owned())),
            DistanceSample::new(1, -2.0, 11, None),
            DistanceSample::new(2, 0.5, 12, None),
            DistanceSample::new(1, f64::INFINITY, 13, None),
            DistanceSample::new(1, 3.0, 14, None),
        ];
        for sample in samples {
            assert_eq!(
                wrapped.aggregate_distance(sample.clone()).await,
                plain.aggregate_distance(sample).await
            );
        }

        for obu_id in [1, 2, 3] {
            let expected = plain.calculate_invoice(obu_id).await;
            let actual = wrapped.calculate_invoice(obu_id).await;
            assert_eq!(actual, expected);
            if let (Ok(a), Ok(b)) = (&actual, &expected) {
                assert_eq!(a.total_amount.to_bits(), b.total_amount.to_bits());
            }
        }
    }
}
