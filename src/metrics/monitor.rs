//! Request lifecycle monitoring.
//!
//! A `RequestMonitor` is created for one request, entered when the request starts being
//! handled and closed exactly once when handling is over:
//!
//! - `ActiveRequest::exit` is the normal close. The response status must have been
//!   reported with `observe` before, otherwise `MetricsError::ErrUnobservedResponse` is
//!   returned and no count or latency is recorded.
//! - `ActiveRequest::abort`, or dropping the active request, is the abnormal close. The
//!   status is forced to 500 whatever was observed. Dropping covers handler errors
//!   returned with `?`, panics and cancelled futures alike.
//!
//! The in-flight gauge is incremented on enter and decremented on close only when both
//! `record_on_enter` and `record_on_exit` are set, so it can never drift.

use std::{
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use actix_web::http::Method;

use crate::{
    errors::MetricsError,
    metrics::{
        http_metrics::RequestRecorder,
        route::{normalize, RouteMatch, RouteParameterPolicy},
    },
};

/// Status recorded when a request ends abnormally.
pub const ABNORMAL_EXIT_STATUS: u16 = 500;

/// Label tuple of a monitored request: its method and its normalized path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestDescriptor {
    method: String,
    path: String,
}

impl RequestDescriptor {
    pub fn new(method: &str, path: &str) -> Self {
        Self { method: method.to_string(), path: path.to_string() }
    }

    pub fn from_route(method: &Method, route: &RouteMatch, policy: &RouteParameterPolicy) -> Result<Self, MetricsError> {
        Ok(Self { method: method.as_str().to_string(), path: normalize(route, policy)? })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOptions {
    pub record_on_enter: bool,
    pub record_on_exit: bool,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self { record_on_enter: true, record_on_exit: true }
    }
}

impl MonitorOptions {
    fn tracks_in_progress(&self) -> bool {
        self.record_on_enter && self.record_on_exit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCause {
    Normal,
    Abnormal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOutcome {
    pub status: u16,
    pub elapsed: Duration,
    pub cause: ExitCause,
}

pub struct RequestMonitor {
    request: RequestDescriptor,
    recorder: Arc<dyn RequestRecorder>,
    options: MonitorOptions,
}

impl RequestMonitor {
    pub fn new(request: RequestDescriptor, recorder: Arc<dyn RequestRecorder>, options: MonitorOptions) -> Self {
        Self { request, recorder, options }
    }

    pub fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    /// Start monitoring: record the start instant and count the request as in flight.
    pub fn enter(self) -> Result<ActiveRequest, MetricsError> {
        let in_progress = self.options.tracks_in_progress();
        if in_progress {
            self.recorder.inc_in_progress(&self.request)?;
        }

        Ok(ActiveRequest {
            request: self.request,
            recorder: self.recorder,
            options: self.options,
            start_time: Some(Instant::now()),
            observed_status: None,
            in_progress,
            closed: false,
        })
    }

    /// Monitor `fut` from start to end.
    ///
    /// On `Ok` the status given by `status_of` is observed and the monitor closes
    /// normally. `status_of` returns `None` when the value itself carries a failure, such
    /// as a response built from a handler error; the monitor then closes abnormally and
    /// the value is still returned. On `Err` (and if `fut` is dropped before completing)
    /// it closes abnormally and the error is returned untouched.
    pub async fn run<F, T, E, S>(self, fut: F, status_of: S) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        S: FnOnce(&T) -> Option<u16>,
        E: From<MetricsError>,
    {
        let mut active = self.enter()?;
        let value = fut.await?;
        match status_of(&value) {
            Some(status) => {
                active.observe(status);
                active.exit()?;
            }
            None => {
                active.abort();
            }
        }
        Ok(value)
    }
}

/// A monitor between enter and close.
pub struct ActiveRequest {
    request: RequestDescriptor,
    recorder: Arc<dyn RequestRecorder>,
    options: MonitorOptions,
    start_time: Option<Instant>,
    observed_status: Option<u16>,
    in_progress: bool,
    closed: bool,
}

impl ActiveRequest {
    pub fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    /// Report the response status. The last reported status wins.
    pub fn observe(&mut self, status: u16) {
        self.observed_status = Some(status);
    }

    pub fn observed_status(&self) -> Option<u16> {
        self.observed_status
    }

    /// Close after the handler completed.
    pub fn exit(mut self) -> Result<MonitorOutcome, MetricsError> {
        self.close(ExitCause::Normal)
    }

    /// Close after the handler failed.
    pub fn abort(mut self) -> MonitorOutcome {
        self.close_abnormally()
    }

    fn close_abnormally(&mut self) -> MonitorOutcome {
        let elapsed = self.elapsed();
        match self.close(ExitCause::Abnormal) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("failed to record aborted request {} {}: {}", self.request.method, self.request.path, e);
                MonitorOutcome { status: ABNORMAL_EXIT_STATUS, elapsed, cause: ExitCause::Abnormal }
            }
        }
    }

    fn elapsed(&self) -> Duration {
        self.start_time.map(|start| start.elapsed()).unwrap_or_default()
    }

    fn close(&mut self, cause: ExitCause) -> Result<MonitorOutcome, MetricsError> {
        self.closed = true;
        let elapsed = self.elapsed();

        let status = match cause {
            ExitCause::Normal => self.observed_status,
            ExitCause::Abnormal => {
                self.observed_status = Some(ABNORMAL_EXIT_STATUS);
                self.observed_status
            }
        };

        let recorded = match status {
            Some(status) if self.options.record_on_exit => self.recorder.record(&self.request, status, elapsed),
            Some(_) => Ok(()),
            None => Err(MetricsError::ErrUnobservedResponse),
        };

        let released = if self.in_progress {
            self.in_progress = false;
            self.recorder.dec_in_progress(&self.request)
        } else {
            Ok(())
        };

        recorded?;
        released?;

        let status = status.unwrap_or(ABNORMAL_EXIT_STATUS);
        log::trace!(
            "request {} {} closed ({:?}), status: {}, elapsed: {:?}",
            self.request.method,
            self.request.path,
            cause,
            status,
            elapsed
        );

        Ok(MonitorOutcome { status, elapsed, cause })
    }
}

impl Drop for ActiveRequest {
    fn drop(&mut self) {
        if !self.closed {
            self.close_abnormally();
        }
    }
}
