//! Worker pool construction.

use crate::error::WorkerResult;
use crate::option::WorkerPoolOptions;
use crate::pool::WorkerPool;

/// Builds worker pools.
pub trait WorkerPoolFactory: Send + Sync {
    fn create(&self, options: WorkerPoolOptions) -> WorkerResult<WorkerPool>;
}

/// Factory building a [`WorkerPool`] straight from its options.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWorkerPoolFactory;

impl DefaultWorkerPoolFactory {
    pub const fn new() -> Self {
        Self
    }
}

impl WorkerPoolFactory for DefaultWorkerPoolFactory {
    fn create(&self, options: WorkerPoolOptions) -> WorkerResult<WorkerPool> {
        Ok(WorkerPool::new(options))
    }
}
