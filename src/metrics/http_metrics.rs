use std::time::Duration;

use crate::{
    errors::MetricsError,
    metrics::{
        monitor::RequestDescriptor,
        registry::{CounterVec, GaugeVec, HistogramVec, LabeledMetric, MetricsRegistry},
    },
};

pub const REQUEST_COUNT: &str = "request_count";
pub const REQUEST_COUNT_HELP: &str = "Number of requests received";
pub const REQUEST_LATENCY: &str = "request_latency";
pub const REQUEST_LATENCY_HELP: &str = "Elapsed time per request";
pub const REQUESTS_IN_PROGRESS: &str = "requests_in_progress";
pub const REQUESTS_IN_PROGRESS_HELP: &str = "Requests in progress";

/// Where a request monitor pushes its accounting.
///
/// `HttpMetrics` is the implementation backed by the three standard families; tests and
/// applications with their own metric layout can inject another one.
pub trait RequestRecorder: Send + Sync {
    fn inc_in_progress(&self, request: &RequestDescriptor) -> Result<(), MetricsError>;

    fn dec_in_progress(&self, request: &RequestDescriptor) -> Result<(), MetricsError>;

    fn record(&self, request: &RequestDescriptor, status: u16, elapsed: Duration) -> Result<(), MetricsError>;
}

#[derive(Debug, Clone)]
pub struct HttpMetrics {
    request_count: CounterVec,
    request_latency: HistogramVec,
    requests_in_progress: GaugeVec,
}

impl HttpMetrics {
    /// Register the three request families on `registry`. Nothing is registered when one
    /// of their names is already taken.
    pub fn new(registry: &MetricsRegistry) -> Result<Self, MetricsError> {
        for name in [REQUEST_COUNT, REQUEST_LATENCY, REQUESTS_IN_PROGRESS] {
            if registry.is_registered(name)? {
                return Err(MetricsError::ErrMetricAlreadyRegistered(name.to_string()));
            }
        }

        let request_count = registry.counter(REQUEST_COUNT, REQUEST_COUNT_HELP, &["method", "path", "status"])?;
        let request_latency = registry.histogram(REQUEST_LATENCY, REQUEST_LATENCY_HELP, &["method", "path"], None)?;
        let requests_in_progress =
            registry.gauge(REQUESTS_IN_PROGRESS, REQUESTS_IN_PROGRESS_HELP, &["method", "path"])?;

        Ok(Self { request_count, request_latency, requests_in_progress })
    }

    pub fn request_count(&self) -> &CounterVec {
        &self.request_count
    }

    pub fn request_latency(&self) -> &HistogramVec {
        &self.request_latency
    }

    pub fn requests_in_progress(&self) -> &GaugeVec {
        &self.requests_in_progress
    }
}

impl RequestRecorder for HttpMetrics {
    fn inc_in_progress(&self, request: &RequestDescriptor) -> Result<(), MetricsError> {
        self.requests_in_progress.labels(&[request.method(), request.path()])?.inc();
        Ok(())
    }

    fn dec_in_progress(&self, request: &RequestDescriptor) -> Result<(), MetricsError> {
        self.requests_in_progress.labels(&[request.method(), request.path()])?.dec();
        Ok(())
    }

    fn record(&self, request: &RequestDescriptor, status: u16, elapsed: Duration) -> Result<(), MetricsError> {
        let status = status.to_string();
        self.request_count.labels(&[request.method(), request.path(), status.as_str()])?.inc();
        self.request_latency.labels(&[request.method(), request.path()])?.observe(elapsed.as_secs_f64());
        Ok(())
    }
}
