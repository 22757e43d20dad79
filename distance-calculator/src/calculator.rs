use thiserror::Error;
use toll_common::middleware::Fault;
use toll_common::types::TelemetryEvent;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalculatorError {
    #[error("obu {0} reported non-finite coordinates")]
    NonFinite(i64),
}

impl Fault for CalculatorError {
    fn is_fault(&self) -> bool {
        false
    }
}

pub trait CalculatorService: Send + Sync {
    fn calculate_distance(&self, event: &TelemetryEvent) -> Result<f64, CalculatorError>;
}

/// Straight-line distance between the previous and the current position.
#[derive(Clone, Copy, Debug, Default)]
pub struct DistanceCalculator;

impl CalculatorService for DistanceCalculator {
    fn calculate_distance(&self, event: &TelemetryEvent) -> Result<f64, CalculatorError> {
        let distance = calc_distance(
            event.curr_lat,
            event.curr_long,
            event.prev_lat,
            event.prev_long,
        );

        if distance.is_finite() {
            Ok(distance)
        } else {
            Err(CalculatorError::NonFinite(event.obu_id))
        }
    }
}

pub fn calc_distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
}
