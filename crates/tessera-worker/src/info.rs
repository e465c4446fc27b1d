//! Read-only snapshot of the pool for status reporting.

use crate::execution::{WorkerExecution, WorkerStatus};
use crate::pool::WorkerPool;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tessera_core::TesseraResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    pub execution: String,
    pub message: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerInfo {
    pub status: WorkerStatus,
    pub events: Vec<EventInfo>,
}

impl From<&WorkerExecution> for WorkerInfo {
    fn from(execution: &WorkerExecution) -> Self {
        Self {
            status: execution.status(),
            events: execution
                .events()
                .into_iter()
                .map(|event| EventInfo {
                    execution: event.execution_id().to_string(),
                    message: event.message().to_string(),
                    time: event.timestamp(),
                })
                .collect(),
        }
    }
}

/// Status and event history of every worker, keyed by worker name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerPoolInfo {
    pub workers: BTreeMap<String, WorkerInfo>,
}

impl WorkerPoolInfo {
    pub fn from_pool(pool: &WorkerPool) -> Self {
        let workers = pool
            .executions()
            .into_iter()
            .map(|(name, execution)| (name, WorkerInfo::from(execution.as_ref())))
            .collect();

        Self { workers }
    }
}

/// Info contributor exposing the pool under the `worker` key.
#[derive(Debug, Clone)]
pub struct WorkerModuleInfo {
    pool: WorkerPool,
}

impl WorkerModuleInfo {
    pub const NAME: &'static str = "worker";

    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    pub fn data(&self) -> TesseraResult<serde_json::Value> {
        Ok(serde_json::to_value(WorkerPoolInfo::from_pool(&self.pool))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_info_from_execution() {
        let execution = WorkerExecution::new("exec-1", "mailer", 1, 0.0);
        execution
            .set_status(WorkerStatus::Running)
            .add_event("starting execution attempt 1/1");

        let info = WorkerInfo::from(&execution);
        assert_eq!(info.status, WorkerStatus::Running);
        assert_eq!(info.events.len(), 1);
        assert_eq!(info.events[0].execution, "exec-1");
        assert_eq!(info.events[0].message, "starting execution attempt 1/1");
    }

    #[test]
    fn test_module_info_on_idle_pool() {
        let info = WorkerModuleInfo::new(WorkerPool::default());
        assert_eq!(info.name(), "worker");

        let data = info.data().unwrap();
        assert_eq!(data, serde_json::json!({ "workers": {} }));
    }

    #[test]
    fn test_event_info_serializes_expected_keys() {
        let execution = WorkerExecution::new("exec-1", "mailer", 1, 0.0);
        execution.add_event("hello");

        let value = serde_json::to_value(WorkerInfo::from(&execution)).unwrap();
        assert_eq!(value["status"], "unknown");
        assert_eq!(value["events"][0]["execution"], "exec-1");
        assert_eq!(value["events"][0]["message"], "hello");
        assert!(value["events"][0]["time"].is_string());
    }
}
