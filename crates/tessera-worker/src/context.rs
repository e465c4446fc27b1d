//! Execution context handed to workers.

use std::sync::Arc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::Span;

/// Per-attempt context passed to [`Worker::run`](crate::Worker::run).
///
/// Carries the worker name and the current execution id for log
/// correlation, the pool's cancellation token, and the attempt span.
/// Futures instrumented with [`span`](Self::span) log with the
/// `worker` and `worker_execution_id` fields attached.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    worker_name: Arc<str>,
    execution_id: Arc<str>,
    cancellation: CancellationToken,
    span: Span,
}

impl WorkerContext {
    /// Create a new context.
    pub fn new(
        worker_name: impl Into<Arc<str>>,
        execution_id: impl Into<Arc<str>>,
        cancellation: CancellationToken,
        span: Span,
    ) -> Self {
        Self {
            worker_name: worker_name.into(),
            execution_id: execution_id.into(),
            cancellation,
            span,
        }
    }

    /// Name of the running worker.
    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    /// Id of the current execution attempt.
    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// The pool's cancellation token.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns true once the pool has been stopped.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Completes when the pool is stopped.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancellation.cancelled()
    }

    /// Span of the current attempt.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_accessors() {
        let token = CancellationToken::new();
        let ctx = WorkerContext::new("mailer", "exec-1", token.clone(), Span::none());

        assert_eq!(ctx.worker_name(), "mailer");
        assert_eq!(ctx.execution_id(), "exec-1");
        assert!(!ctx.is_cancelled());

        token.cancel();
        assert!(ctx.is_cancelled());
        assert!(ctx.cancellation_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_completes_after_cancel() {
        let token = CancellationToken::new();
        let ctx = WorkerContext::new("mailer", "exec-1", token.clone(), Span::none());

        let waiter = ctx.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
            waiter.execution_id().to_string()
        });

        token.cancel();
        assert_eq!(handle.await.unwrap(), "exec-1");
    }

    #[test]
    fn test_cancelled_is_pending_until_cancel() {
        let token = CancellationToken::new();
        let ctx = WorkerContext::new("mailer", "exec-1", token.clone(), Span::none());

        let mut cancelled = tokio_test::task::spawn(ctx.cancelled());
        tokio_test::assert_pending!(cancelled.poll());

        token.cancel();
        assert!(cancelled.is_woken());
        tokio_test::assert_ready!(cancelled.poll());
    }
}
