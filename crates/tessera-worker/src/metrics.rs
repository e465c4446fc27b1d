//! Prometheus metrics for worker executions.
//!
//! A [`MetricsRegistry`] owns a Prometheus recorder and keeps track of the
//! collectors attached to it. [`WorkerMetrics`] is the collector used by the
//! pool: a single counter family labelled by worker and execution status.

use crate::error::{WorkerError, WorkerResult};
use metrics::{Counter, Key, KeyName, Label, Level, Metadata, Recorder, SharedString};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Metric names for the worker pool.
pub mod names {
    /// Total worker execution events, by worker and status.
    pub const WORKER_EXECUTIONS_TOTAL: &str = "worker_executions_total";
}

/// Label values of the `status` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMetricStatus {
    Started,
    Restarted,
    Success,
    Error,
}

impl ExecutionMetricStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMetricStatus::Started => "started",
            ExecutionMetricStatus::Restarted => "restarted",
            ExecutionMetricStatus::Success => "success",
            ExecutionMetricStatus::Error => "error",
        }
    }
}

/// Something that can be attached to a [`MetricsRegistry`].
pub trait Collector: Send + Sync {
    /// Fully-qualified metric name, unique per registry.
    fn fq_name(&self) -> &str;

    /// Publish metric descriptions to the recorder.
    fn describe(&self, recorder: &dyn Recorder);

    /// Called once registration succeeded.
    fn attach(&self, registry: MetricsRegistry);
}

struct RegistryInner {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    collectors: Mutex<HashSet<String>>,
}

/// Prometheus-compatible metrics registry.
///
/// Cheap to clone; clones share the same recorder and collector set.
#[derive(Clone)]
pub struct MetricsRegistry {
    inner: Arc<RegistryInner>,
}

impl MetricsRegistry {
    /// Create a registry backed by a standalone Prometheus recorder.
    pub fn new() -> Self {
        Self::from_recorder(PrometheusBuilder::new().build_recorder())
    }

    /// Create a registry from a pre-configured recorder.
    pub fn from_recorder(recorder: PrometheusRecorder) -> Self {
        let handle = recorder.handle();
        Self {
            inner: Arc::new(RegistryInner {
                recorder,
                handle,
                collectors: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Register a collector.
    ///
    /// Fails with [`WorkerError::MetricsAlreadyRegistered`] when a
    /// collector with the same name is already registered; the rejected
    /// collector is left untouched.
    pub fn register(&self, collector: &dyn Collector) -> WorkerResult<()> {
        let fq_name = collector.fq_name().to_string();

        if !self.inner.collectors.lock().insert(fq_name.clone()) {
            return Err(WorkerError::MetricsAlreadyRegistered(fq_name));
        }

        collector.describe(&self.inner.recorder);
        collector.attach(self.clone());

        debug!(collector = %fq_name, "Registered metrics collector");
        Ok(())
    }

    /// Whether a collector name is registered.
    pub fn is_registered(&self, fq_name: &str) -> bool {
        self.inner.collectors.lock().contains(fq_name)
    }

    /// Resolve a counter handle.
    pub fn counter(&self, name: &str, labels: Vec<Label>) -> Counter {
        let key = Key::from_parts(name.to_string(), labels);
        let metadata = Metadata::new(module_path!(), Level::INFO, Some(module_path!()));
        self.inner.recorder.register_counter(&key, &metadata)
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.inner.handle.render()
    }

    /// Handle usable by an HTTP scrape endpoint.
    pub fn handle(&self) -> PrometheusHandle {
        self.inner.handle.clone()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("collectors", &*self.inner.collectors.lock())
            .finish()
    }
}

/// Lowercase a name and replace spaces and dashes with underscores.
pub fn sanitize(name: &str) -> String {
    name.to_lowercase().replace([' ', '-'], "_")
}

/// Worker execution counters.
///
/// Increments are no-ops until the metrics are registered, and stay
/// no-ops if registration was rejected.
#[derive(Debug)]
pub struct WorkerMetrics {
    fq_name: String,
    registry: OnceLock<MetricsRegistry>,
}

impl WorkerMetrics {
    /// Create the counters under `<namespace>_<subsystem>_worker_executions_total`.
    ///
    /// Empty namespace or subsystem parts are skipped.
    pub fn new(namespace: &str, subsystem: &str) -> Self {
        let fq_name = [sanitize(namespace), sanitize(subsystem), names::WORKER_EXECUTIONS_TOTAL.to_string()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");

        Self {
            fq_name,
            registry: OnceLock::new(),
        }
    }

    /// Attach the counters to a registry.
    pub fn register(&self, registry: &MetricsRegistry) -> WorkerResult<&Self> {
        registry.register(self)?;
        Ok(self)
    }

    /// Whether increments are being recorded.
    pub fn is_registered(&self) -> bool {
        self.registry.get().is_some()
    }

    pub fn increment_worker_execution_start(&self, worker_name: &str) {
        self.increment(worker_name, ExecutionMetricStatus::Started);
    }

    pub fn increment_worker_execution_restart(&self, worker_name: &str) {
        self.increment(worker_name, ExecutionMetricStatus::Restarted);
    }

    pub fn increment_worker_execution_success(&self, worker_name: &str) {
        self.increment(worker_name, ExecutionMetricStatus::Success);
    }

    pub fn increment_worker_execution_error(&self, worker_name: &str) {
        self.increment(worker_name, ExecutionMetricStatus::Error);
    }

    fn increment(&self, worker_name: &str, status: ExecutionMetricStatus) {
        if let Some(registry) = self.registry.get() {
            registry
                .counter(
                    &self.fq_name,
                    vec![
                        Label::new("worker", sanitize(worker_name)),
                        Label::new("status", status.as_str()),
                    ],
                )
                .increment(1);
        }
    }
}

impl Default for WorkerMetrics {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl Collector for WorkerMetrics {
    fn fq_name(&self) -> &str {
        &self.fq_name
    }

    fn describe(&self, recorder: &dyn Recorder) {
        recorder.describe_counter(
            KeyName::from(self.fq_name.clone()),
            None,
            SharedString::from("Total number of worker executions, by worker and status"),
        );
    }

    fn attach(&self, registry: MetricsRegistry) {
        let _ = self.registry.set(registry);
    }
}
