//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_CREDENTIAL_WAIT_REQUEUE_SECS, DEFAULT_ERROR_BACKOFF_MAX_SECS,
    DEFAULT_ERROR_BACKOFF_MIN_SECS, DEFAULT_INIT_JOB_IMAGE, DEFAULT_INIT_JOB_NAMESPACE,
    DEFAULT_MAX_CONCURRENT_RECONCILIATIONS, DEFAULT_METRICS_PORT,
    DEFAULT_REPLICA_DRIFT_REQUEUE_SECS, DEFAULT_WORKLOAD_CONTAINER_PORT, DEFAULT_WORKLOAD_IMAGE,
    DEFAULT_WORKLOAD_CREATED_REQUEUE_SECS,
};
use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// How long to wait before looking for a missing credential source secret again (seconds)
    pub credential_wait_requeue_secs: u64,
    /// How long to wait after correcting the workload replica count (seconds)
    pub replica_drift_requeue_secs: u64,
    /// How long to wait after creating the workload (seconds)
    pub workload_created_requeue_secs: u64,
    /// Lower bound of the per-resource error backoff (seconds)
    pub error_backoff_min_secs: u64,
    /// Upper bound of the per-resource error backoff (seconds)
    pub error_backoff_max_secs: u64,
    /// Port of the metrics and probe server
    pub metrics_port: u16,
    /// Namespace of the cluster-wide initialization job
    pub init_job_namespace: String,
    /// Image of the initialization job container
    pub init_job_image: String,
    /// Image of the workload container
    pub workload_image: String,
    /// Port exposed by the workload container
    pub workload_container_port: i32,
    /// Maximum concurrent reconciliations
    pub max_concurrent_reconciliations: u16,
    /// Restrict the watch to one namespace (all namespaces when unset)
    pub watch_namespace: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            credential_wait_requeue_secs: DEFAULT_CREDENTIAL_WAIT_REQUEUE_SECS,
            replica_drift_requeue_secs: DEFAULT_REPLICA_DRIFT_REQUEUE_SECS,
            workload_created_requeue_secs: DEFAULT_WORKLOAD_CREATED_REQUEUE_SECS,
            error_backoff_min_secs: DEFAULT_ERROR_BACKOFF_MIN_SECS,
            error_backoff_max_secs: DEFAULT_ERROR_BACKOFF_MAX_SECS,
            metrics_port: DEFAULT_METRICS_PORT,
            init_job_namespace: DEFAULT_INIT_JOB_NAMESPACE.to_string(),
            init_job_image: DEFAULT_INIT_JOB_IMAGE.to_string(),
            workload_image: DEFAULT_WORKLOAD_IMAGE.to_string(),
            workload_container_port: DEFAULT_WORKLOAD_CONTAINER_PORT,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            watch_namespace: None,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Values that fail to parse fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            credential_wait_requeue_secs: parse_or(
                &lookup,
                "CREDENTIAL_WAIT_REQUEUE_SECS",
                defaults.credential_wait_requeue_secs,
            ),
            replica_drift_requeue_secs: parse_or(
                &lookup,
                "REPLICA_DRIFT_REQUEUE_SECS",
                defaults.replica_drift_requeue_secs,
            ),
            workload_created_requeue_secs: parse_or(
                &lookup,
                "WORKLOAD_CREATED_REQUEUE_SECS",
                defaults.workload_created_requeue_secs,
            ),
            error_backoff_min_secs: parse_or(
                &lookup,
                "ERROR_BACKOFF_MIN_SECS",
                defaults.error_backoff_min_secs,
            ),
            error_backoff_max_secs: parse_or(
                &lookup,
                "ERROR_BACKOFF_MAX_SECS",
                defaults.error_backoff_max_secs,
            ),
            metrics_port: parse_or(&lookup, "METRICS_PORT", defaults.metrics_port),
            init_job_namespace: string_or(
                &lookup,
                "INIT_JOB_NAMESPACE",
                defaults.init_job_namespace,
            ),
            init_job_image: string_or(&lookup, "INIT_JOB_IMAGE", defaults.init_job_image),
            workload_image: string_or(&lookup, "WORKLOAD_IMAGE", defaults.workload_image),
            workload_container_port: parse_or(
                &lookup,
                "WORKLOAD_CONTAINER_PORT",
                defaults.workload_container_port,
            ),
            max_concurrent_reconciliations: parse_or(
                &lookup,
                "MAX_CONCURRENT_RECONCILIATIONS",
                defaults.max_concurrent_reconciliations,
            ),
            watch_namespace: lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty()),
        }
    }

    /// Get credential wait requeue duration
    #[must_use]
    pub fn credential_wait_requeue(&self) -> Duration {
        Duration::from_secs(self.credential_wait_requeue_secs)
    }

    /// Get replica drift requeue duration
    #[must_use]
    pub fn replica_drift_requeue(&self) -> Duration {
        Duration::from_secs(self.replica_drift_requeue_secs)
    }

    /// Get workload created requeue duration
    #[must_use]
    pub fn workload_created_requeue(&self) -> Duration {
        Duration::from_secs(self.workload_created_requeue_secs)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn string_or<F>(lookup: &F, key: &str, default: String) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}
