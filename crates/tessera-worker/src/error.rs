//! Worker pool error types.

use tessera_core::TesseraError;
use thiserror::Error;

/// Result type for worker pool operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors surfaced synchronously by the worker pool.
///
/// Failures of the workers themselves never show up here: they are
/// recorded on the execution, in metrics and in logs.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// No execution exists for the given worker name.
    #[error("execution for worker {0} was not found")]
    ExecutionNotFound(String),

    /// No registration exists for the given worker name.
    #[error("registration for worker {0} was not found")]
    RegistrationNotFound(String),

    /// A collector with the same fully-qualified name is already registered.
    #[error("duplicate metrics collector registration attempted: {0}")]
    MetricsAlreadyRegistered(String),

    /// The pool is already running.
    #[error("worker pool is already started")]
    AlreadyStarted,

    /// The pool was stopped and cannot be started again.
    #[error("worker pool was stopped and cannot be restarted")]
    NotStartable,

    /// Invalid configuration.
    #[error("worker configuration error: {0}")]
    Configuration(String),
}

impl WorkerError {
    /// Returns true for unknown-name lookups.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WorkerError::ExecutionNotFound(_) | WorkerError::RegistrationNotFound(_)
        )
    }
}

impl From<WorkerError> for TesseraError {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::ExecutionNotFound(name) => TesseraError::not_found("worker_execution", name),
            WorkerError::RegistrationNotFound(name) => {
                TesseraError::not_found("worker_registration", name)
            }
            WorkerError::MetricsAlreadyRegistered(_) => TesseraError::Conflict(err.to_string()),
            WorkerError::Configuration(message) => TesseraError::Configuration(message),
            WorkerError::AlreadyStarted | WorkerError::NotStartable => {
                TesseraError::Internal(err.to_string())
            }
        }
    }
}

impl From<TesseraError> for WorkerError {
    fn from(err: TesseraError) -> Self {
        WorkerError::Configuration(err.to_string())
    }
}
