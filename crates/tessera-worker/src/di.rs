//! Dependency injection wiring for the worker pool.
//!
//! Exposes the pool as a Shaku component so that the rest of an
//! application can resolve it next to its other services.

use crate::error::WorkerResult;
use crate::factory::{DefaultWorkerPoolFactory, WorkerPoolFactory};
use crate::health::WorkerProbe;
use crate::info::WorkerModuleInfo;
use crate::metrics::{MetricsRegistry, WorkerMetrics};
use crate::option::{WorkerExecutionOptions, WorkerPoolOptions};
use crate::pool::WorkerPool;
use crate::registration::WorkerRegistration;
use shaku::{module, Component};
use std::sync::Arc;
use tessera_config::WorkerConfig;
use tessera_core::Interface;
use tracing::info;

/// Interface for the worker pool service.
pub trait WorkerPoolInterface: Interface {
    /// The underlying pool.
    fn pool(&self) -> &WorkerPool;

    /// Info contributor for the pool.
    fn info(&self) -> WorkerModuleInfo {
        WorkerModuleInfo::new(self.pool().clone())
    }

    /// Health probe for the pool.
    fn probe(&self) -> WorkerProbe {
        WorkerProbe::new(self.pool().clone())
    }
}

/// Worker pool service component.
#[derive(Component)]
#[shaku(interface = WorkerPoolInterface)]
pub struct WorkerPoolService {
    pool: WorkerPool,
}

impl WorkerPoolService {
    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }
}

impl WorkerPoolInterface for WorkerPoolService {
    fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}

module! {
    pub WorkerModule {
        components = [
            WorkerPoolService,
        ],
        providers = [],
    }
}

/// Builds the worker module from configuration.
///
/// Configured per-worker overrides fill in whatever a registration leaves
/// unset. When `metrics.collect` is enabled the counters are registered on
/// `registry` (or a fresh registry); a name conflict there is an error.
pub fn build_worker_module(
    config: &WorkerConfig,
    workers: Vec<WorkerRegistration>,
    registry: Option<&MetricsRegistry>,
) -> WorkerResult<Arc<WorkerModule>> {
    config.validate()?;

    let mut options = WorkerPoolOptions::from_config(config);

    if config.metrics.collect {
        let registry = registry.cloned().unwrap_or_default();
        let metrics = Arc::new(WorkerMetrics::new(&config.metrics.namespace, &config.metrics.subsystem));
        metrics.register(&registry)?;
        options = options.with_metrics(metrics);
    }

    for registration in workers {
        let overrides = WorkerExecutionOptions::from_config(config, registration.name());
        options = options.with_shared_worker(registration.worker().clone(), registration.options().or(overrides));
    }

    let pool = DefaultWorkerPoolFactory::new().create(options)?;

    info!(
        workers = pool.registrations().len(),
        metrics = config.metrics.collect,
        "Built worker module"
    );

    let module = WorkerModule::builder()
        .with_component_parameters::<WorkerPoolService>(WorkerPoolServiceParameters { pool })
        .build();

    Ok(Arc::new(module))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WorkerContext;
    use crate::error::WorkerError;
    use crate::worker::Worker;
    use async_trait::async_trait;
    use shaku::HasComponent;
    use tessera_config::WorkerOverrideConfig;

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

    fn config() -> WorkerConfig {
        let mut config = WorkerConfig {
            defer: 0.0,
            attempts: 2,
            ..Default::default()
        };
        config.workers.insert(
            "noop".to_string(),
            WorkerOverrideConfig {
                defer: Some(1.5),
                attempts: Some(5),
            },
        );
        config
    }

    #[test]
    fn test_module_resolves_pool_with_config_overrides() {
        let workers = vec![WorkerRegistration::new(
            NoopWorker,
            WorkerExecutionOptions::new().with_max_executions_attempts(3),
        )];

        let module = build_worker_module(&config(), workers, None).unwrap();
        let service: Arc<dyn WorkerPoolInterface> = module.resolve();

        let registration = service.pool().registration("noop").unwrap();
        assert_eq!(registration.options().max_executions_attempts, Some(3));
        assert_eq!(registration.options().deferred_start_threshold, Some(1.5));
        assert_eq!(service.info().name(), "worker");
    }

    #[test]
    fn test_metrics_conflict_is_fatal() {
        let registry = MetricsRegistry::new();
        let mut config = config();
        config.metrics.collect = true;
        config.metrics.namespace = "app".to_string();

        build_worker_module(&config, Vec::new(), Some(&registry)).unwrap();
        let err = build_worker_module(&config, Vec::new(), Some(&registry)).err().unwrap();
        assert!(matches!(err, WorkerError::MetricsAlreadyRegistered(_)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = WorkerConfig {
            defer: -1.0,
            ..Default::default()
        };
        let err = build_worker_module(&config, Vec::new(), None).err().unwrap();
        assert!(matches!(err, WorkerError::Configuration(_)));
    }
}
