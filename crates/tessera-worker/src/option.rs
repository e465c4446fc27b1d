//! Pool and per-worker execution options.

use crate::metrics::WorkerMetrics;
use crate::registration::WorkerRegistration;
use crate::worker::Worker;
use std::sync::Arc;
use tessera_config::WorkerConfig;
use tessera_core::{IdGenerator, UuidIdGenerator};

/// Default pool-wide deferred start threshold, in seconds.
pub const DEFAULT_DEFERRED_START_THRESHOLD: f64 = 0.0;

/// Default pool-wide maximum execution attempts.
pub const DEFAULT_MAX_EXECUTIONS_ATTEMPTS: u32 = 1;

/// Per-worker execution overrides.
///
/// Unset values inherit the pool-wide defaults when the execution is
/// first created.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorkerExecutionOptions {
    pub deferred_start_threshold: Option<f64>,
    pub max_executions_attempts: Option<u32>,
}

impl WorkerExecutionOptions {
    /// Options with nothing overridden.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds to wait before the first attempt.
    pub fn with_deferred_start_threshold(mut self, threshold: f64) -> Self {
        self.deferred_start_threshold = Some(threshold);
        self
    }

    /// Maximum number of attempts before the execution stays in error.
    pub fn with_max_executions_attempts(mut self, attempts: u32) -> Self {
        self.max_executions_attempts = Some(attempts);
        self
    }

    /// Resolve the deferred start threshold against a pool default.
    ///
    /// Negative and non-finite values resolve to 0 (no deferral).
    pub fn resolve_deferred_start_threshold(&self, global: f64) -> f64 {
        let threshold = self.deferred_start_threshold.unwrap_or(global);
        if threshold.is_finite() && threshold > 0.0 {
            threshold
        } else {
            0.0
        }
    }

    /// Resolve the maximum attempts against a pool default, never below 1.
    pub fn resolve_max_executions_attempts(&self, global: u32) -> u32 {
        self.max_executions_attempts.unwrap_or(global).max(1)
    }
}

/// Options used to build a [`WorkerPool`](crate::WorkerPool).
///
/// Builder calls apply in order, so a later `with_worker` for the same
/// name replaces an earlier one.
#[derive(Clone)]
pub struct WorkerPoolOptions {
    pub(crate) generator: Arc<dyn IdGenerator>,
    pub(crate) metrics: Option<Arc<WorkerMetrics>>,
    pub(crate) global_deferred_start_threshold: f64,
    pub(crate) global_max_executions_attempts: u32,
    pub(crate) registrations: Vec<WorkerRegistration>,
}

impl Default for WorkerPoolOptions {
    fn default() -> Self {
        Self {
            generator: Arc::new(UuidIdGenerator::new()),
            metrics: None,
            global_deferred_start_threshold: DEFAULT_DEFERRED_START_THRESHOLD,
            global_max_executions_attempts: DEFAULT_MAX_EXECUTIONS_ATTEMPTS,
            registrations: Vec::new(),
        }
    }
}

impl WorkerPoolOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the pool-wide defaults from configuration.
    ///
    /// Only `defer` and `attempts` are taken. Per-worker overrides in
    /// `config.workers` are not applied here; merge them into each
    /// registration with [`WorkerExecutionOptions::from_config`] and
    /// [`WorkerExecutionOptions::or`], as
    /// [`build_worker_module`](crate::build_worker_module) does.
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::default()
            .with_global_deferred_start_threshold(config.defer)
            .with_global_max_executions_attempts(config.attempts)
    }

    /// Register a worker with its execution overrides.
    pub fn with_worker<W: Worker>(mut self, worker: W, options: WorkerExecutionOptions) -> Self {
        self.registrations.push(WorkerRegistration::new(worker, options));
        self
    }

    /// Register an already shared worker.
    pub fn with_shared_worker(mut self, worker: Arc<dyn Worker>, options: WorkerExecutionOptions) -> Self {
        self.registrations.push(WorkerRegistration::from_arc(worker, options));
        self
    }

    /// Register a prepared registration.
    pub fn with_registration(mut self, registration: WorkerRegistration) -> Self {
        self.registrations.push(registration);
        self
    }

    /// Id generator used for execution ids.
    pub fn with_generator<G: IdGenerator + 'static>(mut self, generator: G) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    /// Metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<WorkerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Pool-wide deferred start threshold, in seconds.
    pub fn with_global_deferred_start_threshold(mut self, threshold: f64) -> Self {
        self.global_deferred_start_threshold = threshold;
        self
    }

    /// Pool-wide maximum execution attempts.
    pub fn with_global_max_executions_attempts(mut self, attempts: u32) -> Self {
        self.global_max_executions_attempts = attempts;
        self
    }

    pub fn global_deferred_start_threshold(&self) -> f64 {
        self.global_deferred_start_threshold
    }

    pub fn global_max_executions_attempts(&self) -> u32 {
        self.global_max_executions_attempts
    }
}

impl WorkerExecutionOptions {
    /// Overrides for `worker_name` taken from configuration, if any.
    pub fn from_config(config: &WorkerConfig, worker_name: &str) -> Self {
        config
            .overrides_for(worker_name)
            .map(|overrides| Self {
                deferred_start_threshold: overrides.defer,
                max_executions_attempts: overrides.attempts,
            })
            .unwrap_or_default()
    }

    /// Fill unset values from `fallback`, keeping explicit ones.
    pub fn or(self, fallback: Self) -> Self {
        Self {
            deferred_start_threshold: self.deferred_start_threshold.or(fallback.deferred_start_threshold),
            max_executions_attempts: self.max_executions_attempts.or(fallback.max_executions_attempts),
        }
    }
}
