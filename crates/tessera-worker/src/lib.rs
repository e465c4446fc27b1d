//! # Tessera Worker
//!
//! In-process pool of named, long-running background workers:
//! - Per-worker retry up to a maximum number of attempts
//! - Deferred start of the first attempt
//! - Panic recovery, treated like an error return
//! - Execution state and event history for status reporting
//! - Prometheus counters for started, restarted, successful and failed attempts
//! - Cooperative cancellation and a blocking, graceful stop
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_worker::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Mailer;
//!
//! #[async_trait::async_trait]
//! impl Worker for Mailer {
//!     fn name(&self) -> &str {
//!         "mailer"
//!     }
//!
//!     async fn run(&self, ctx: WorkerContext) -> anyhow::Result<()> {
//!         ctx.cancelled().await;
//!         Ok(())
//!     }
//! }
//!
//! let pool = WorkerPool::new(
//!     WorkerPoolOptions::new()
//!         .with_global_max_executions_attempts(3)
//!         .with_worker(Mailer, WorkerExecutionOptions::new().with_deferred_start_threshold(1.0)),
//! );
//!
//! let shutdown = CancellationToken::new();
//! pool.start(&shutdown).await?;
//! // ...
//! pool.stop().await?;
//! ```

pub mod context;
pub mod di;
pub mod error;
pub mod execution;
pub mod factory;
pub mod health;
pub mod info;
pub mod metrics;
pub mod option;
pub mod pool;
pub mod registration;
pub mod worker;

pub use context::WorkerContext;
pub use di::{build_worker_module, WorkerModule, WorkerPoolInterface, WorkerPoolService};
pub use error::{WorkerError, WorkerResult};
pub use execution::{WorkerExecution, WorkerExecutionEvent, WorkerStatus};
pub use factory::{DefaultWorkerPoolFactory, WorkerPoolFactory};
pub use health::WorkerProbe;
pub use info::{EventInfo, WorkerInfo, WorkerModuleInfo, WorkerPoolInfo};
pub use crate::metrics::{Collector, MetricsRegistry, WorkerMetrics};
pub use option::{
    WorkerExecutionOptions, WorkerPoolOptions, DEFAULT_DEFERRED_START_THRESHOLD, DEFAULT_MAX_EXECUTIONS_ATTEMPTS,
};
pub use pool::WorkerPool;
pub use registration::WorkerRegistration;
pub use worker::Worker;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::context::WorkerContext;
    pub use crate::option::{WorkerExecutionOptions, WorkerPoolOptions};
    pub use crate::pool::WorkerPool;
    pub use crate::worker::Worker;
    pub use crate::{WorkerError, WorkerResult};
}
