//! Worker pool orchestrating background executions.

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::execution::{WorkerExecution, WorkerStatus};
use crate::metrics::WorkerMetrics;
use crate::option::WorkerPoolOptions;
use crate::registration::WorkerRegistration;
use futures::FutureExt;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tessera_core::IdGenerator;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, info_span, warn, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolState {
    Idle,
    Running,
    Stopped,
}

struct PoolInner {
    state: PoolState,
    cancellation: Option<CancellationToken>,
    registrations: HashMap<String, Arc<WorkerRegistration>>,
    executions: HashMap<String, Arc<WorkerExecution>>,
}

struct PoolShared {
    inner: RwLock<PoolInner>,
    tracker: TaskTracker,
    generator: Arc<dyn IdGenerator>,
    metrics: Option<Arc<WorkerMetrics>>,
    global_deferred_start_threshold: f64,
    global_max_executions_attempts: u32,
}

/// Why an attempt ended without success.
enum AttemptFailure {
    Error(String),
    Panic(String),
}

impl AttemptFailure {
    fn detail(&self) -> &str {
        match self {
            AttemptFailure::Error(detail) | AttemptFailure::Panic(detail) => detail,
        }
    }

    fn stop_message(&self, attempt: u32, max: u32) -> String {
        match self {
            AttemptFailure::Error(err) => {
                format!("stopping execution attempt {}/{} with error: {}", attempt, max, err)
            }
            AttemptFailure::Panic(value) => {
                format!("stopping execution attempt {}/{} with recovered panic: {}", attempt, max, value)
            }
        }
    }

    fn restart_message(&self) -> &'static str {
        match self {
            AttemptFailure::Error(_) => "restarting after error",
            AttemptFailure::Panic(_) => "restarting after panic recovery",
        }
    }
}

/// Runs registered workers in the background.
///
/// Each registration gets its own task. A failed or panicking attempt is
/// restarted in a fresh task, with a new execution id, until the worker's
/// maximum attempts are reached. Failures never propagate to the caller:
/// they are recorded on the [`WorkerExecution`], in metrics and in logs.
///
/// The pool is cheap to clone; clones share state.
#[derive(Clone)]
pub struct WorkerPool {
    shared: Arc<PoolShared>,
}

impl WorkerPool {
    /// Create a pool from options.
    pub fn new(options: WorkerPoolOptions) -> Self {
        let WorkerPoolOptions {
            generator,
            metrics,
            global_deferred_start_threshold,
            global_max_executions_attempts,
            registrations,
        } = options;

        let pool = Self {
            shared: Arc::new(PoolShared {
                inner: RwLock::new(PoolInner {
                    state: PoolState::Idle,
                    cancellation: None,
                    registrations: HashMap::new(),
                    executions: HashMap::new(),
                }),
                tracker: TaskTracker::new(),
                generator,
                metrics,
                global_deferred_start_threshold,
                global_max_executions_attempts,
            }),
        };

        pool.register(registrations);
        pool
    }

    /// Add or replace registrations, keyed by worker name.
    ///
    /// Registrations added after [`start`](Self::start) are not launched.
    pub fn register(&self, registrations: impl IntoIterator<Item = WorkerRegistration>) -> &Self {
        let mut inner = self.shared.inner.write();
        for registration in registrations {
            let name = registration.name().to_string();
            if inner.registrations.insert(name.clone(), Arc::new(registration)).is_some() {
                debug!(worker = %name, "Replaced worker registration");
            } else {
                debug!(worker = %name, "Registered worker");
            }
        }
        self
    }

    /// Launch one background execution per registration.
    ///
    /// Returns immediately. Workers observe a child token of `parent`, so
    /// cancelling `parent` has the same effect on them as [`stop`](Self::stop).
    pub async fn start(&self, parent: &CancellationToken) -> WorkerResult<()> {
        // Held until every initial task is spawned so a concurrent `stop`
        // waits for them.
        let _launch = self.shared.tracker.token();

        let registrations: Vec<Arc<WorkerRegistration>> = {
            let mut inner = self.shared.inner.write();
            match inner.state {
                PoolState::Running => return Err(WorkerError::AlreadyStarted),
                PoolState::Stopped => return Err(WorkerError::NotStartable),
                PoolState::Idle => {}
            }
            inner.state = PoolState::Running;
            inner.cancellation = Some(parent.child_token());
            inner.registrations.values().cloned().collect()
        };

        info!(workers = registrations.len(), "Starting worker pool");

        for registration in registrations {
            self.start_worker_registration(registration);
        }

        Ok(())
    }

    /// Cancel all workers and wait for every execution task to exit.
    ///
    /// Workers that ignore cancellation keep this call waiting. Always
    /// returns `Ok(())`; worker failures are not reported here.
    pub async fn stop(&self) -> WorkerResult<()> {
        let cancellation = {
            let mut inner = self.shared.inner.write();
            inner.state = PoolState::Stopped;
            inner.cancellation.clone()
        };

        info!("Stopping worker pool");

        if let Some(cancellation) = cancellation {
            cancellation.cancel();
        }

        self.shared.tracker.close();
        self.shared.tracker.wait().await;

        info!("Worker pool stopped");
        Ok(())
    }

    /// Whether the pool has been started and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.shared.inner.read().state == PoolState::Running
    }

    /// Number of execution tasks currently alive.
    pub fn active_tasks(&self) -> usize {
        self.shared.tracker.len()
    }

    /// All executions created so far, by worker name.
    pub fn executions(&self) -> HashMap<String, Arc<WorkerExecution>> {
        self.shared.inner.read().executions.clone()
    }

    /// Execution of a worker.
    pub fn execution(&self, worker_name: &str) -> WorkerResult<Arc<WorkerExecution>> {
        self.shared
            .inner
            .read()
            .executions
            .get(worker_name)
            .cloned()
            .ok_or_else(|| WorkerError::ExecutionNotFound(worker_name.to_string()))
    }

    /// All registrations, by worker name.
    pub fn registrations(&self) -> HashMap<String, Arc<WorkerRegistration>> {
        self.shared.inner.read().registrations.clone()
    }

    /// Registration of a worker.
    pub fn registration(&self, worker_name: &str) -> WorkerResult<Arc<WorkerRegistration>> {
        self.shared
            .inner
            .read()
            .registrations
            .get(worker_name)
            .cloned()
            .ok_or_else(|| WorkerError::RegistrationNotFound(worker_name.to_string()))
    }

    /// Metrics sink, when configured.
    pub fn metrics(&self) -> Option<&Arc<WorkerMetrics>> {
        self.shared.metrics.as_ref()
    }

    fn start_worker_registration(&self, registration: Arc<WorkerRegistration>) {
        let execution = self.retrieve_worker_registration_execution(&registration);
        let execution_id = execution.id();

        let cancellation = self.shared.inner.read().cancellation.clone().unwrap_or_default();

        let span = info_span!(
            parent: None,
            "worker_execution",
            worker = %registration.name(),
            worker_execution_id = %execution_id,
            attempt = tracing::field::Empty,
        );

        let ctx = WorkerContext::new(registration.name(), execution_id, cancellation, span.clone());

        let pool = self.clone();
        self.shared
            .tracker
            .spawn(pool.run_attempt(registration, execution, ctx).instrument(span));
    }

    fn retrieve_worker_registration_execution(&self, registration: &WorkerRegistration) -> Arc<WorkerExecution> {
        let mut inner = self.shared.inner.write();
        inner
            .executions
            .entry(registration.name().to_string())
            .or_insert_with(|| {
                let options = registration.options();
                Arc::new(WorkerExecution::new(
                    self.shared.generator.generate(),
                    registration.name(),
                    options.resolve_max_executions_attempts(self.shared.global_max_executions_attempts),
                    options.resolve_deferred_start_threshold(self.shared.global_deferred_start_threshold),
                ))
            })
            .clone()
    }

    async fn run_attempt(
        self,
        registration: Arc<WorkerRegistration>,
        execution: Arc<WorkerExecution>,
        ctx: WorkerContext,
    ) {
        let name = registration.name();

        if execution.current_execution_attempt() == 0 {
            let threshold = execution.deferred_start_threshold();
            if threshold > 0.0 {
                execution
                    .set_status(WorkerStatus::Deferred)
                    .add_event(format!("deferring execution attempt for {} seconds", threshold));
                info!(worker = %name, "deferring execution attempt for {} seconds", threshold);

                let delay = Duration::try_from_secs_f64(threshold).unwrap_or(Duration::MAX);
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = ctx.cancelled() => {
                        debug!(worker = %name, "Deferred start interrupted by pool cancellation");
                    }
                }
            }
        }

        let attempt = execution.increment_current_execution_attempt();
        let max = execution.max_executions_attempts();
        ctx.span().record("attempt", attempt);

        execution
            .set_status(WorkerStatus::Running)
            .add_event(format!("starting execution attempt {}/{}", attempt, max));
        info!(worker = %name, attempt, max_attempts = max, "starting execution attempt {}/{}", attempt, max);

        if let Some(metrics) = &self.shared.metrics {
            metrics.increment_worker_execution_start(name);
        }

        let worker = registration.worker().clone();
        let attempt_ctx = ctx.clone();
        let outcome = AssertUnwindSafe(async move { worker.run(attempt_ctx).await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {
                execution
                    .set_status(WorkerStatus::Success)
                    .add_event(format!("stopping execution attempt {}/{} with success", attempt, max));
                info!(worker = %name, attempt, max_attempts = max, "stopping execution attempt {}/{} with success", attempt, max);

                if let Some(metrics) = &self.shared.metrics {
                    metrics.increment_worker_execution_success(name);
                }
            }
            Ok(Err(err)) => {
                self.handle_failure(registration.clone(), &execution, attempt, max, AttemptFailure::Error(err.to_string()));
            }
            Err(payload) => {
                self.handle_failure(
                    registration.clone(),
                    &execution,
                    attempt,
                    max,
                    AttemptFailure::Panic(panic_message(payload.as_ref())),
                );
            }
        }
    }

    fn handle_failure(
        &self,
        registration: Arc<WorkerRegistration>,
        execution: &WorkerExecution,
        attempt: u32,
        max: u32,
        failure: AttemptFailure,
    ) {
        let name = registration.name();

        execution
            .set_status(WorkerStatus::Error)
            .add_event(failure.stop_message(attempt, max));
        error!(
            worker = %name,
            attempt,
            max_attempts = max,
            error = %failure.detail(),
            "{}",
            failure.stop_message(attempt, max)
        );

        if let Some(metrics) = &self.shared.metrics {
            metrics.increment_worker_execution_error(name);
        }

        if execution.has_remaining_attempts() {
            execution.add_event(failure.restart_message());
            warn!(worker = %name, attempt, max_attempts = max, "{}", failure.restart_message());

            execution.set_id(self.shared.generator.generate());

            if let Some(metrics) = &self.shared.metrics {
                metrics.increment_worker_execution_restart(name);
            }

            self.start_worker_registration(registration);
        } else {
            execution.add_event("max execution attempts reached");
            error!(worker = %name, max_attempts = max, "max execution attempts reached");
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(WorkerPoolOptions::default())
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.read();
        f.debug_struct("WorkerPool")
            .field("state", &inner.state)
            .field("registrations", &inner.registrations.keys().collect::<Vec<_>>())
            .field("active_tasks", &self.shared.tracker.len())
            .finish()
    }
}

/// String form of a recovered panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(err) = payload.downcast_ref::<anyhow::Error>() {
        err.to_string()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::WorkerExecutionOptions;
    use crate::worker::Worker;
    use async_trait::async_trait;

    struct NamedWorker(&'static str);

    #[async_trait]
    impl Worker for NamedWorker {
        fn name(&self) -> &str {
            self.0
        }

        async fn run(&self, _ctx: WorkerContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_is_idempotent_by_name() {
        let pool = WorkerPool::default();
        pool.register([
            WorkerRegistration::new(NamedWorker("a"), WorkerExecutionOptions::new()),
            WorkerRegistration::new(NamedWorker("b"), WorkerExecutionOptions::new()),
        ]);
        pool.register([WorkerRegistration::new(
            NamedWorker("a"),
            WorkerExecutionOptions::new().with_max_executions_attempts(4),
        )]);

        assert_eq!(pool.registrations().len(), 2);
        let a = pool.registration("a").unwrap();
        assert_eq!(a.options().max_executions_attempts, Some(4));
    }

    #[test]
    fn test_unknown_names_are_not_found() {
        let pool = WorkerPool::default();

        let err = pool.execution("missing").unwrap_err();
        assert_eq!(err.to_string(), "execution for worker missing was not found");

        let err = pool.registration("missing").unwrap_err();
        assert_eq!(err.to_string(), "registration for worker missing was not found");
    }

    #[test]
    fn test_execution_is_created_lazily_with_resolved_options() {
        let pool = WorkerPool::new(
            WorkerPoolOptions::new()
                .with_global_max_executions_attempts(3)
                .with_global_deferred_start_threshold(2.0)
                .with_worker(NamedWorker("a"), WorkerExecutionOptions::new().with_deferred_start_threshold(0.5)),
        );
        assert!(pool.executions().is_empty());

        let registration = pool.registration("a").unwrap();
        let execution = pool.retrieve_worker_registration_execution(&registration);
        assert_eq!(execution.max_executions_attempts(), 3);
        assert_eq!(execution.deferred_start_threshold(), 0.5);

        let again = pool.retrieve_worker_registration_execution(&registration);
        assert!(Arc::ptr_eq(&execution, &again));
        assert_eq!(pool.executions().len(), 1);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }

    #[test]
    fn test_failure_messages() {
        let error = AttemptFailure::Error("x".into());
        assert_eq!(error.stop_message(1, 2), "stopping execution attempt 1/2 with error: x");
        assert_eq!(error.restart_message(), "restarting after error");

        let panic = AttemptFailure::Panic("boom".into());
        assert_eq!(panic.stop_message(2, 2), "stopping execution attempt 2/2 with recovered panic: boom");
        assert_eq!(panic.restart_message(), "restarting after panic recovery");
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let pool = WorkerPool::new(WorkerPoolOptions::new().with_worker(NamedWorker("a"), WorkerExecutionOptions::new()));
        let token = CancellationToken::new();

        pool.start(&token).await.unwrap();
        assert!(pool.is_running());
        assert!(matches!(pool.start(&token).await, Err(WorkerError::AlreadyStarted)));

        pool.stop().await.unwrap();
        assert!(!pool.is_running());
        assert!(matches!(pool.start(&token).await, Err(WorkerError::NotStartable)));
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let pool = WorkerPool::default();
        assert!(pool.stop().await.is_ok());
        assert_eq!(pool.active_tasks(), 0);
    }
}
