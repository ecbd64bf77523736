//! The explicitly constructed metrics registry and the labeled metric handles it hands out.
//!
//! A `MetricsRegistry` wraps a `prometheus_client` registry. Every handle (`CounterVec`,
//! `GaugeVec`, `HistogramVec`) is a metric family keyed by an ordered list of label names;
//! `labels()` binds concrete values and returns the child metric, which shares its storage
//! with the family.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use prometheus_client::{
    encoding::text::encode,
    metrics::{
        counter::Counter,
        family::{Family, MetricConstructor},
        gauge::Gauge,
        histogram::Histogram,
    },
    registry::Registry,
};

use crate::errors::MetricsError;

/// Bucket boundaries used when a histogram is registered without its own.
pub const DEFAULT_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0];

type LabelSet = Vec<(String, String)>;

/// A metric family whose children are selected by ordered label values.
pub trait LabeledMetric {
    type Child;

    fn name(&self) -> &str;

    fn label_names(&self) -> &[String];

    /// Bind `values`, in label-name order, and return the child metric.
    fn labels<S: AsRef<str>>(&self, values: &[S]) -> Result<Self::Child, MetricsError>;
}

impl<T: LabeledMetric> LabeledMetric for &T {
    type Child = T::Child;

    fn name(&self) -> &str {
        (*self).name()
    }

    fn label_names(&self) -> &[String] {
        (*self).label_names()
    }

    fn labels<S: AsRef<str>>(&self, values: &[S]) -> Result<Self::Child, MetricsError> {
        (*self).labels(values)
    }
}

/// Anything that can absorb an observed value, such as a histogram child.
pub trait Observe {
    fn observe(&self, value: f64);
}

impl Observe for Histogram {
    fn observe(&self, value: f64) {
        Histogram::observe(self, value);
    }
}

#[derive(Debug, Clone)]
pub struct HistogramBuckets(Arc<[f64]>);

impl MetricConstructor<Histogram> for HistogramBuckets {
    fn new_metric(&self) -> Histogram {
        Histogram::new(self.0.iter().copied())
    }
}

#[derive(Debug, Clone)]
struct FamilyMeta {
    name: String,
    label_names: Arc<[String]>,
}

impl FamilyMeta {
    fn new(name: &str, label_names: &[&str]) -> Self {
        Self { name: name.to_string(), label_names: label_names.iter().map(|n| n.to_string()).collect() }
    }

    fn label_set<S: AsRef<str>>(&self, values: &[S]) -> Result<LabelSet, MetricsError> {
        if values.len() != self.label_names.len() {
            return Err(MetricsError::ErrMetricLabelsMismatch {
                name: self.name.clone(),
                expected: self.label_names.len(),
                got: values.len(),
            });
        }

        Ok(self.label_names.iter().cloned().zip(values.iter().map(|v| v.as_ref().to_string())).collect())
    }
}

#[derive(Debug, Clone)]
pub struct CounterVec {
    meta: FamilyMeta,
    family: Family<LabelSet, Counter>,
}

#[derive(Debug, Clone)]
pub struct GaugeVec {
    meta: FamilyMeta,
    family: Family<LabelSet, Gauge>,
}

#[derive(Debug, Clone)]
pub struct HistogramVec {
    meta: FamilyMeta,
    family: Family<LabelSet, Histogram, HistogramBuckets>,
}

impl LabeledMetric for CounterVec {
    type Child = Counter;

    fn name(&self) -> &str {
        &self.meta.name
    }

    fn label_names(&self) -> &[String] {
        &self.meta.label_names
    }

    fn labels<S: AsRef<str>>(&self, values: &[S]) -> Result<Counter, MetricsError> {
        let label_set = self.meta.label_set(values)?;
        Ok(self.family.get_or_create(&label_set).clone())
    }
}

impl LabeledMetric for GaugeVec {
    type Child = Gauge;

    fn name(&self) -> &str {
        &self.meta.name
    }

    fn label_names(&self) -> &[String] {
        &self.meta.label_names
    }

    fn labels<S: AsRef<str>>(&self, values: &[S]) -> Result<Gauge, MetricsError> {
        let label_set = self.meta.label_set(values)?;
        Ok(self.family.get_or_create(&label_set).clone())
    }
}

impl LabeledMetric for HistogramVec {
    type Child = Histogram;

    fn name(&self) -> &str {
        &self.meta.name
    }

    fn label_names(&self) -> &[String] {
        &self.meta.label_names
    }

    fn labels<S: AsRef<str>>(&self, values: &[S]) -> Result<Histogram, MetricsError> {
        let label_set = self.meta.label_set(values)?;
        Ok(self.family.get_or_create(&label_set).clone())
    }
}

/// Process-wide metrics registry.
///
/// Create one at startup, register the metric families on it and share it (usually as
/// `Arc<MetricsRegistry>`) with whatever serves the scrape endpoint.
#[derive(Default)]
pub struct MetricsRegistry {
    registry: Mutex<Registry>,
    names: Mutex<HashSet<String>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str, help: &str, label_names: &[&str]) -> Result<CounterVec, MetricsError> {
        let family = Family::<LabelSet, Counter>::default();
        self.register(name, help, family.clone())?;
        Ok(CounterVec { meta: FamilyMeta::new(name, label_names), family })
    }

    pub fn gauge(&self, name: &str, help: &str, label_names: &[&str]) -> Result<GaugeVec, MetricsError> {
        let family = Family::<LabelSet, Gauge>::default();
        self.register(name, help, family.clone())?;
        Ok(GaugeVec { meta: FamilyMeta::new(name, label_names), family })
    }

    /// Register a histogram family. `None` buckets means `DEFAULT_BUCKETS`.
    pub fn histogram(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: Option<&[f64]>,
    ) -> Result<HistogramVec, MetricsError> {
        let buckets = HistogramBuckets(buckets.unwrap_or(DEFAULT_BUCKETS).into());
        let family = Family::<LabelSet, Histogram, HistogramBuckets>::new_with_constructor(buckets);
        self.register(name, help, family.clone())?;
        Ok(HistogramVec { meta: FamilyMeta::new(name, label_names), family })
    }

    pub fn is_registered(&self, name: &str) -> Result<bool, MetricsError> {
        Ok(self.names.lock()?.contains(name))
    }

    /// Encode the current state of every registered family in the text exposition format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let registry = self.registry.lock()?;
        let mut buffer = String::new();
        encode(&mut buffer, &registry)?;
        Ok(buffer)
    }

    fn register(
        &self,
        name: &str,
        help: &str,
        metric: impl prometheus_client::registry::Metric,
    ) -> Result<(), MetricsError> {
        let mut names = self.names.lock()?;
        if !names.insert(name.to_string()) {
            return Err(MetricsError::ErrMetricAlreadyRegistered(name.to_string()));
        }

        self.registry.lock()?.register(name, help, metric);
        log::debug!("registered metric: {}", name);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_registry_counter() {
        let registry = MetricsRegistry::new();
        let jobs = registry.counter("jobs", "Jobs processed", &["kind", "result"]).unwrap();
        assert_eq!(jobs.name(), "jobs");
        assert_eq!(jobs.label_names(), &["kind".to_string(), "result".to_string()]);

        jobs.labels(&["csv", "ok"]).unwrap().inc();
        jobs.labels(&["csv", "ok"]).unwrap().inc();
        assert_eq!(jobs.labels(&["csv", "ok"]).unwrap().get(), 2);
        assert_eq!(jobs.labels(&["csv", "failed"]).unwrap().get(), 0);

        let text = registry.encode().unwrap();
        assert!(text.contains("Jobs processed"));
        assert!(text.contains(r#"jobs_total{kind="csv",result="ok"} 2"#));
    }

    #[test]
    fn test_registry_gauge() {
        let registry = MetricsRegistry::new();
        let queue = registry.gauge("queue_depth", "Queued jobs", &["queue"]).unwrap();
        let child = queue.labels(&["default"]).unwrap();
        child.inc();
        child.inc();
        child.dec();
        assert_eq!(queue.labels(&["default"]).unwrap().get(), 1);
    }

    #[test]
    fn test_registry_histogram() {
        let registry = MetricsRegistry::new();
        let latency = registry.histogram("job_seconds", "Job duration", &["kind"], Some(&[1.0, 5.0])).unwrap();
        latency.labels(&["csv"]).unwrap().observe(0.5);
        latency.labels(&["csv"]).unwrap().observe(3.0);

        let text = registry.encode().unwrap();
        assert!(text.contains(r#"job_seconds_count{kind="csv"} 2"#));
        assert!(text.contains(r#"job_seconds_sum{kind="csv"} 3.5"#));
    }

    #[test]
    fn test_registry_labels_mismatch() {
        let registry = MetricsRegistry::new();
        let jobs = registry.counter("jobs", "Jobs processed", &["kind", "result"]).unwrap();
        let err = jobs.labels(&["csv"]).unwrap_err();
        assert_eq!(err, MetricsError::ErrMetricLabelsMismatch { name: "jobs".into(), expected: 2, got: 1 });
    }

    #[test]
    fn test_registry_duplicate_name() {
        let registry = MetricsRegistry::new();
        assert!(!registry.is_registered("jobs").unwrap());
        assert!(registry.counter("jobs", "Jobs processed", &[]).is_ok());
        assert!(registry.is_registered("jobs").unwrap());
        let err = registry.gauge("jobs", "Jobs again", &[]).unwrap_err();
        assert_eq!(err, MetricsError::ErrMetricAlreadyRegistered("jobs".into()));
    }
}
