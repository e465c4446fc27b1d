//! Health probe over worker executions.

use crate::execution::WorkerStatus;
use crate::pool::WorkerPool;
use async_trait::async_trait;
use tessera_core::{HealthCheck, HealthStatus};

/// Reports unhealthy while any execution is in `unknown` or `error`.
#[derive(Debug, Clone)]
pub struct WorkerProbe {
    pool: WorkerPool,
}

impl WorkerProbe {
    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthCheck for WorkerProbe {
    fn name(&self) -> &str {
        "worker"
    }

    async fn check(&self) -> HealthStatus {
        let mut failing: Vec<String> = self
            .pool
            .executions()
            .into_iter()
            .filter_map(|(name, execution)| match execution.status() {
                status @ (WorkerStatus::Unknown | WorkerStatus::Error) => {
                    Some(format!("{} is in {} status", name, status))
                }
                _ => None,
            })
            .collect();

        if failing.is_empty() {
            HealthStatus::Healthy
        } else {
            failing.sort();
            HealthStatus::Unhealthy(failing.join(", "))
        }
    }
}
