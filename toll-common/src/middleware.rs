//! Logging and metrics decorators for domain services.
//!
//! Both middlewares are `tower::Layer`s, so a chain is built with
//! `tower::ServiceBuilder`: the first layer added is the outermost one and
//! observes the call first and the result last. The wrapper types only carry
//! the inner service and a service name. Each service crate implements its own
//! trait for [`LogMiddleware`] and [`MetricsMiddleware`], delegating to the
//! inner service and reporting through [`LogMiddleware::record`] and
//! [`MetricsMiddleware::record`].
//!
//! Neither middleware touches arguments, results or errors.

use std::fmt;
use std::time::Instant;

use tower::Layer;
use tracing::{error, info, warn};

/// Errors flowing through the middlewares tell whether they are a fault of the
/// service (logged as errors) or an expected outcome such as a lookup miss.
pub trait Fault: fmt::Display {
    fn is_fault(&self) -> bool {
        true
    }
}

#[derive(Clone, Debug)]
pub struct LogLayer {
    service: &'static str,
}

impl LogLayer {
    pub fn new(service: &'static str) -> Self {
        Self { service }
    }
}

impl<S> Layer<S> for LogLayer {
    type Service = LogMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LogMiddleware {
            inner,
            service: self.service,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogMiddleware<S> {
    inner: S,
    service: &'static str,
}

impl<S> LogMiddleware<S> {
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Emit one structured record for a finished call.
    pub fn record<T, E>(
        &self,
        operation: &'static str,
        started: Instant,
        request: fmt::Arguments<'_>,
        result: &Result<T, E>,
    ) where
        T: fmt::Debug,
        E: Fault,
    {
        let took_ms = started.elapsed().as_secs_f64() * 1000.0;
        match result {
            Ok(response) => info!(
                service = self.service,
                operation,
                took_ms,
                request = %request,
                response = ?response,
                "{} {}", self.service, operation
            ),
            Err(err) if err.is_fault() => error!(
                service = self.service,
                operation,
                took_ms,
                request = %request,
                error = %err,
                "{} {} failed", self.service, operation
            ),
            Err(err) => warn!(
                service = self.service,
                operation,
                took_ms,
                request = %request,
                error = %err,
                "{} {} rejected", self.service, operation
            ),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MetricsLayer {
    service: &'static str,
}

impl MetricsLayer {
    pub fn new(service: &'static str) -> Self {
        Self { service }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsMiddleware {
            inner,
            service: self.service,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MetricsMiddleware<S> {
    inner: S,
    service: &'static str,
}

impl<S> MetricsMiddleware<S> {
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Count the call, count it again as an error if it failed, and record its latency.
    /// Every series is labelled by service and operation.
    pub fn record<T, E>(&self, operation: &'static str, started: Instant, result: &Result<T, E>) {
        let latency = started.elapsed().as_secs_f64();
        let labels = [("service", self.service), ("operation", operation)];

        metrics::counter!("service_requests_total", &labels).increment(1);
        if result.is_err() {
            metrics::counter!("service_errors_total", &labels).increment(1);
        }
        metrics::histogram!("service_request_duration_seconds", &labels).record(latency);
    }
}
