//! Timing of arbitrary code into a labeled histogram.
//!
//! ```
//! use rusty_prometheus::metrics::{labels::Label, registry::MetricsRegistry, timer::TimeMonitor};
//!
//! let registry = MetricsRegistry::new();
//! let job_seconds = registry.histogram("job_seconds", "Job duration", &["kind"], None).unwrap();
//!
//! let timer = TimeMonitor::new(&job_seconds, vec![Label::from("csv")]);
//! let rows = timer.call(|| 42).unwrap();
//! assert_eq!(rows, 42);
//!
//! {
//!     let _guard = timer.start().unwrap();
//!     // timed block
//! }
//! ```

use std::{
    future::Future,
    time::{Duration, Instant},
};

use crate::{
    errors::MetricsError,
    metrics::{
        labels::{resolve, Label},
        registry::{LabeledMetric, Observe},
    },
};

pub struct TimeMonitor<M> {
    metric: M,
    labels: Vec<Label>,
}

impl<M> TimeMonitor<M>
where
    M: LabeledMetric,
    M::Child: Observe,
{
    pub fn new(metric: M, labels: Vec<Label>) -> Self {
        Self { metric, labels }
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Bind the labels and start the clock. The elapsed seconds are observed when the
    /// returned guard goes out of scope.
    pub fn start(&self) -> Result<TimerGuard<M::Child>, MetricsError> {
        let values = resolve(&self.labels);
        let observer = self.metric.labels(values.as_slice())?;
        Ok(TimerGuard { observer, start_time: Instant::now() })
    }

    /// Time one call of `f`.
    pub fn call<F, T>(&self, f: F) -> Result<T, MetricsError>
    where
        F: FnOnce() -> T,
    {
        let _guard = self.start()?;
        Ok(f())
    }

    /// Time `fut` until it completes or is dropped.
    pub async fn call_async<F, T>(&self, fut: F) -> Result<T, MetricsError>
    where
        F: Future<Output = T>,
    {
        let _guard = self.start()?;
        Ok(fut.await)
    }
}

pub struct TimerGuard<O: Observe> {
    observer: O,
    start_time: Instant,
}

impl<O: Observe> TimerGuard<O> {
    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl<O: Observe> Drop for TimerGuard<O> {
    fn drop(&mut self) {
        self.observer.observe(self.start_time.elapsed().as_secs_f64());
    }
}
