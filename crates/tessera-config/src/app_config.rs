//! Application configuration structures.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tessera_core::telemetry::TelemetryConfig;
use tessera_core::{TesseraError, TesseraResult};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Worker pool configuration.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Logging and tracing configuration.
    #[serde(default)]
    pub observability: TelemetryConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "tessera".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Pool-wide deferred start threshold, in seconds.
    #[serde(default)]
    pub defer: f64,

    /// Pool-wide maximum execution attempts.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Metrics collection.
    #[serde(default)]
    pub metrics: WorkerMetricsConfig,

    /// Per-worker overrides, keyed by worker name.
    #[serde(default)]
    pub workers: BTreeMap<String, WorkerOverrideConfig>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            defer: 0.0,
            attempts: default_attempts(),
            metrics: WorkerMetricsConfig::default(),
            workers: BTreeMap::new(),
        }
    }
}

fn default_attempts() -> u32 {
    1
}

/// Worker metrics configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerMetricsConfig {
    /// Create and register the worker execution counters.
    #[serde(default)]
    pub collect: bool,

    /// Metric namespace prefix.
    #[serde(default)]
    pub namespace: String,

    /// Metric subsystem prefix.
    #[serde(default)]
    pub subsystem: String,
}

/// Execution overrides for a single worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerOverrideConfig {
    /// Deferred start threshold, in seconds.
    #[serde(default)]
    pub defer: Option<f64>,

    /// Maximum execution attempts.
    #[serde(default)]
    pub attempts: Option<u32>,
}

impl WorkerConfig {
    /// Returns the overrides configured for a worker, if any.
    #[must_use]
    pub fn overrides_for(&self, worker_name: &str) -> Option<&WorkerOverrideConfig> {
        self.workers.get(worker_name)
    }

    /// Validates thresholds and attempt counts, including per-worker overrides.
    pub fn validate(&self) -> TesseraResult<()> {
        validate_defer("worker.defer", self.defer)?;
        validate_attempts("worker.attempts", self.attempts)?;

        for (name, overrides) in &self.workers {
            if let Some(defer) = overrides.defer {
                validate_defer(&format!("worker.workers.{}.defer", name), defer)?;
            }
            if let Some(attempts) = overrides.attempts {
                validate_attempts(&format!("worker.workers.{}.attempts", name), attempts)?;
            }
        }

        Ok(())
    }
}

fn validate_defer(key: &str, value: f64) -> TesseraResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(TesseraError::Configuration(format!(
            "{} must be a finite number of seconds >= 0, got {}",
            key, value
        )));
    }
    Ok(())
}

fn validate_attempts(key: &str, value: u32) -> TesseraResult<()> {
    if value == 0 {
        return Err(TesseraError::Configuration(format!("{} must be >= 1", key)));
    }
    Ok(())
}
