use std::sync::Arc;
use std::time::Instant;

use toll_common::middleware::{LogLayer, LogMiddleware, MetricsLayer, MetricsMiddleware};
use toll_common::types::TelemetryEvent;
use tower::ServiceBuilder;

use crate::calculator::{CalculatorError, CalculatorService};

impl<S: CalculatorService> CalculatorService for LogMiddleware<S> {
    fn calculate_distance(&self, event: &TelemetryEvent) -> Result<f64, CalculatorError> {
        let started = Instant::now();
        let result = self.inner().calculate_distance(event);
        self.record(
            "calculate_distance",
            started,
            format_args!("obu_id={}", event.obu_id),
            &result,
        );
        result
    }
}

impl<S: CalculatorService> CalculatorService for MetricsMiddleware<S> {
    fn calculate_distance(&self, event: &TelemetryEvent) -> Result<f64, CalculatorError> {
        let started = Instant::now();
        let result = self.inner().calculate_distance(event);
        self.record("calculate_distance", started, &result);
        result
    }
}

/// Same chain as the aggregator: metrics outermost, then logging.
pub fn instrument<S>(service: S) -> Arc<dyn CalculatorService>
where
    S: CalculatorService + 'static,
{
    Arc::new(
        ServiceBuilder::new()
            .layer(MetricsLayer::new("distance_calculator"))
            .layer(LogLayer::new("distance_calculator"))
            .service(service),
    )
}
