//! Worker registrations.

use crate::option::WorkerExecutionOptions;
use crate::worker::Worker;
use std::fmt;
use std::sync::Arc;

/// Pairs a worker with its execution overrides.
///
/// Registrations are immutable and live as long as the pool.
#[derive(Clone)]
pub struct WorkerRegistration {
    worker: Arc<dyn Worker>,
    options: WorkerExecutionOptions,
}

impl WorkerRegistration {
    /// Create a registration for an owned worker.
    pub fn new<W: Worker>(worker: W, options: WorkerExecutionOptions) -> Self {
        Self::from_arc(Arc::new(worker), options)
    }

    /// Create a registration for a shared worker.
    pub fn from_arc(worker: Arc<dyn Worker>, options: WorkerExecutionOptions) -> Self {
        Self { worker, options }
    }

    /// Worker name, the registration key.
    pub fn name(&self) -> &str {
        self.worker.name()
    }

    pub fn worker(&self) -> &Arc<dyn Worker> {
        &self.worker
    }

    pub fn options(&self) -> &WorkerExecutionOptions {
        &self.options
    }
}

impl fmt::Debug for WorkerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRegistration")
            .field("name", &self.name())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WorkerContext;
    use async_trait::async_trait;

    struct NoopWorker;

    #[async_trait]
    impl Worker for NoopWorker {
        fn name(&self) -> &str {
            "noop"
        }

        async fn run(&self, _ctx: WorkerContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_registration_exposes_worker_and_options() {
        let options = WorkerExecutionOptions::new().with_max_executions_attempts(3);
        let registration = WorkerRegistration::new(NoopWorker, options);

        assert_eq!(registration.name(), "noop");
        assert_eq!(registration.worker().name(), "noop");
        assert_eq!(registration.options().max_executions_attempts, Some(3));
    }

    #[test]
    fn test_registration_debug_shows_name() {
        let registration = WorkerRegistration::new(NoopWorker, WorkerExecutionOptions::new());
        assert!(format!("{:?}", registration).contains("noop"));
    }
}
