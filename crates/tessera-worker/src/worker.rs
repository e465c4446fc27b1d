//! Worker contract.

use crate::context::WorkerContext;
use async_trait::async_trait;

/// A named unit of background work run by the [`WorkerPool`](crate::WorkerPool).
///
/// `run` receives a [`WorkerContext`] carrying the pool's cancellation
/// token. Long-running workers must watch it and return once it fires,
/// otherwise [`WorkerPool::stop`](crate::WorkerPool::stop) waits for them
/// indefinitely.
///
/// Returning `Ok(())` ends the execution with success. Returning an error,
/// or panicking, ends the attempt with an error and the pool restarts the
/// worker while attempts remain.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Unique worker name, used as the registration and execution key.
    fn name(&self) -> &str;

    /// Run the worker.
    async fn run(&self, ctx: WorkerContext) -> anyhow::Result<()>;
}
