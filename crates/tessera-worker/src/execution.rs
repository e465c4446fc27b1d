//! Execution state of registered workers.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution status of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    /// Never started.
    #[default]
    Unknown,
    /// Waiting for the deferred start threshold to elapse.
    Deferred,
    /// An attempt is in progress.
    Running,
    /// The last attempt succeeded.
    Success,
    /// The last attempt failed or panicked.
    Error,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Unknown => "unknown",
            WorkerStatus::Deferred => "deferred",
            WorkerStatus::Running => "running",
            WorkerStatus::Success => "success",
            WorkerStatus::Error => "error",
        }
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable, timestamped log entry of an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerExecutionEvent {
    execution_id: String,
    message: String,
    timestamp: DateTime<Utc>,
}

impl WorkerExecutionEvent {
    pub fn new(execution_id: impl Into<String>, message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            execution_id: execution_id.into(),
            message: message.into(),
            timestamp,
        }
    }

    /// Id of the attempt the event belongs to.
    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[derive(Debug)]
struct ExecutionState {
    id: String,
    status: WorkerStatus,
    current_execution_attempt: u32,
    max_executions_attempts: u32,
    deferred_start_threshold: f64,
    events: Vec<WorkerExecutionEvent>,
}

/// Lifecycle state of one worker across all of its attempts.
///
/// The pool task running the worker is the only writer; reporting code
/// (info, health probes) reads it concurrently through the accessors.
/// Restarts keep the same execution, assign a new id and keep
/// accumulating events.
#[derive(Debug)]
pub struct WorkerExecution {
    name: String,
    state: RwLock<ExecutionState>,
}

impl WorkerExecution {
    /// Create an execution in the `Unknown` status with no attempt made.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        max_executions_attempts: u32,
        deferred_start_threshold: f64,
    ) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(ExecutionState {
                id: id.into(),
                status: WorkerStatus::Unknown,
                current_execution_attempt: 0,
                max_executions_attempts: max_executions_attempts.max(1),
                deferred_start_threshold,
                events: Vec::new(),
            }),
        }
    }

    /// Worker name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the current attempt.
    pub fn id(&self) -> String {
        self.state.read().id.clone()
    }

    pub fn set_id(&self, id: impl Into<String>) -> &Self {
        self.state.write().id = id.into();
        self
    }

    pub fn status(&self) -> WorkerStatus {
        self.state.read().status
    }

    pub fn set_status(&self, status: WorkerStatus) -> &Self {
        self.state.write().status = status;
        self
    }

    /// 1-based number of the current attempt, 0 before the first one.
    pub fn current_execution_attempt(&self) -> u32 {
        self.state.read().current_execution_attempt
    }

    /// Start a new attempt and return its number.
    ///
    /// The counter saturates at the maximum attempts.
    pub fn increment_current_execution_attempt(&self) -> u32 {
        let mut state = self.state.write();
        state.current_execution_attempt = (state.current_execution_attempt + 1).min(state.max_executions_attempts);
        state.current_execution_attempt
    }

    pub fn max_executions_attempts(&self) -> u32 {
        self.state.read().max_executions_attempts
    }

    /// Seconds to wait before the first attempt.
    pub fn deferred_start_threshold(&self) -> f64 {
        self.state.read().deferred_start_threshold
    }

    /// True when attempts remain after the current one.
    pub fn has_remaining_attempts(&self) -> bool {
        let state = self.state.read();
        state.current_execution_attempt < state.max_executions_attempts
    }

    /// Snapshot of all events, in chronological order.
    pub fn events(&self) -> Vec<WorkerExecutionEvent> {
        self.state.read().events.clone()
    }

    /// Append an event tagged with the current execution id.
    pub fn add_event(&self, message: impl Into<String>) -> &Self {
        let mut state = self.state.write();
        let event = WorkerExecutionEvent::new(state.id.clone(), message, Utc::now());
        state.events.push(event);
        self
    }

    /// Whether a given message was recorded.
    pub fn has_event(&self, message: &str) -> bool {
        self.state.read().events.iter().any(|event| event.message == message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_execution_defaults() {
        let execution = WorkerExecution::new("exec-1", "mailer", 3, 0.5);

        assert_eq!(execution.id(), "exec-1");
        assert_eq!(execution.name(), "mailer");
        assert_eq!(execution.status(), WorkerStatus::Unknown);
        assert_eq!(execution.current_execution_attempt(), 0);
        assert_eq!(execution.max_executions_attempts(), 3);
        assert_eq!(execution.deferred_start_threshold(), 0.5);
        assert!(execution.events().is_empty());
    }

    #[test]
    fn test_max_attempts_never_below_one() {
        let execution = WorkerExecution::new("exec-1", "mailer", 0, 0.0);
        assert_eq!(execution.max_executions_attempts(), 1);
        assert_eq!(execution.increment_current_execution_attempt(), 1);
        assert!(!execution.has_remaining_attempts());
    }

    #[test]
    fn test_attempt_counter_saturates_at_max() {
        let execution = WorkerExecution::new("exec-1", "mailer", 2, 0.0);

        assert!(execution.has_remaining_attempts());
        assert_eq!(execution.increment_current_execution_attempt(), 1);
        assert!(execution.has_remaining_attempts());
        assert_eq!(execution.increment_current_execution_attempt(), 2);
        assert!(!execution.has_remaining_attempts());
        assert_eq!(execution.increment_current_execution_attempt(), 2);
    }

    #[test]
    fn test_events_carry_current_id_in_order() {
        let execution = WorkerExecution::new("exec-1", "mailer", 2, 0.0);

        execution.add_event("first");
        execution.set_id("exec-2").add_event("second");

        let events = execution.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].execution_id(), "exec-1");
        assert_eq!(events[0].message(), "first");
        assert_eq!(events[1].execution_id(), "exec-2");
        assert_eq!(events[1].message(), "second");
        assert!(events[0].timestamp() <= events[1].timestamp());
        assert!(execution.has_event("second"));
        assert!(!execution.has_event("third"));
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(WorkerStatus::Unknown.to_string(), "unknown");
        assert_eq!(WorkerStatus::Deferred.to_string(), "deferred");
        assert_eq!(WorkerStatus::Running.to_string(), "running");
        assert_eq!(WorkerStatus::Success.to_string(), "success");
        assert_eq!(WorkerStatus::Error.to_string(), "error");
        assert_eq!(serde_json::to_string(&WorkerStatus::Deferred).unwrap(), "\"deferred\"");
    }

    #[test]
    fn test_concurrent_readers() {
        let execution = std::sync::Arc::new(WorkerExecution::new("exec-1", "mailer", 100, 0.0));

        let writer = {
            let execution = execution.clone();
            std::thread::spawn(move || {
                for i in 0..100 {
                    execution.increment_current_execution_attempt();
                    execution.add_event(format!("event {}", i));
                }
            })
        };

        let reader = {
            let execution = execution.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let _ = execution.status();
                    assert!(execution.current_execution_attempt() <= execution.max_executions_attempts());
                    let _ = execution.events();
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(execution.events().len(), 100);
        assert_eq!(execution.current_execution_attempt(), 100);
    }
}
