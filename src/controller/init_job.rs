//! # Init Job
//!
//! Ensures the cluster-wide database initialization Job exists exactly once.
//!
//! The Job is a singleton shared by every application: it lives in the
//! configured platform namespace, carries no owner reference, and is keyed by
//! an idempotency token. The token is a SHA-256 hash of the Job template
//! inputs and is stored as an annotation, so every reconciliation (from any
//! tenant) computes the same value and can tell from the store alone whether
//! the Job it wants already exists.

use crate::config::ControllerConfig;
use crate::constants::{INIT_JOB_COMMAND, INIT_JOB_NAME, INIT_TOKEN_ANNOTATION, MANAGED_BY_LABEL_VALUE};
use crate::controller::error::StoreError;
use crate::controller::store::ResourceStore;
use crate::observability::metrics;
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const RESTART_POLICY: &str = "Never";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitJobOutcome {
    /// The Job did not exist and was created
    Created,
    /// The Job exists with the current token, or a concurrent reconciliation created it
    AlreadyInitialized,
    /// The Job existed with a stale or missing token; its metadata was refreshed
    Updated,
}

/// Idempotency token for the init Job described by `config`
#[must_use]
pub fn init_token(config: &ControllerConfig) -> String {
    let mut hasher = Sha256::new();
    for part in [
        INIT_JOB_NAME,
        config.init_job_namespace.as_str(),
        config.init_job_image.as_str(),
        RESTART_POLICY,
    ]
    .into_iter()
    .chain(INIT_JOB_COMMAND)
    {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

fn labels() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "app.kubernetes.io/managed-by".to_string(),
            MANAGED_BY_LABEL_VALUE.to_string(),
        ),
        (
            "app.kubernetes.io/name".to_string(),
            INIT_JOB_NAME.to_string(),
        ),
    ])
}

/// Build the desired init Job
#[must_use]
pub fn build_init_job(config: &ControllerConfig) -> Job {
    Job {
        metadata: ObjectMeta {
            name: Some(INIT_JOB_NAME.to_string()),
            namespace: Some(config.init_job_namespace.clone()),
            labels: Some(labels()),
            annotations: Some(BTreeMap::from([(
                INIT_TOKEN_ANNOTATION.to_string(),
                init_token(config),
            )])),
            ..Default::default()
        },
        spec: Some(JobSpec {
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: INIT_JOB_NAME.to_string(),
                        image: Some(config.init_job_image.clone()),
                        command: Some(INIT_JOB_COMMAND.iter().map(ToString::to_string).collect()),
                        ..Default::default()
                    }],
                    restart_policy: Some(RESTART_POLICY.to_string()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn stored_token(job: &Job) -> Option<&str> {
    job.metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(INIT_TOKEN_ANNOTATION))
        .map(String::as_str)
}

/// Ensure the init Job exists with the current token
///
/// # Errors
///
/// Store failures other than a create conflict are returned.
pub async fn ensure_init_job<S>(
    store: &S,
    config: &ControllerConfig,
) -> Result<InitJobOutcome, StoreError>
where
    S: ResourceStore + ?Sized,
{
    let desired = build_init_job(config);
    let token = init_token(config);
    let namespace = config.init_job_namespace.as_str();

    let Some(existing) = store.get::<Job>(INIT_JOB_NAME, namespace).await? else {
        return match store.create(&desired).await {
            Ok(_) => {
                info!(job = INIT_JOB_NAME, namespace = %namespace, "Created init job");
                metrics::increment_resource_writes("Job", "create");
                Ok(InitJobOutcome::Created)
            }
            Err(e) if e.is_already_exists() => {
                debug!(
                    job = INIT_JOB_NAME,
                    namespace = %namespace,
                    "Init job created concurrently"
                );
                Ok(InitJobOutcome::AlreadyInitialized)
            }
            Err(e) => Err(e),
        };
    };

    if stored_token(&existing) == Some(token.as_str()) {
        debug!(job = INIT_JOB_NAME, namespace = %namespace, "Init job already initialized");
        return Ok(InitJobOutcome::AlreadyInitialized);
    }

    // Job templates are immutable once created; only metadata is refreshed.
    warn!(
        job = INIT_JOB_NAME,
        namespace = %namespace,
        stored_token = stored_token(&existing).unwrap_or("<none>"),
        "Init job token differs, refreshing metadata and keeping the existing pod template"
    );
    let mut refreshed = existing;
    refreshed
        .metadata
        .labels
        .get_or_insert_with(BTreeMap::new)
        .extend(labels());
    refreshed
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(INIT_TOKEN_ANNOTATION.to_string(), token);
    store.update(&refreshed).await?;
    metrics::increment_resource_writes("Job", "update");
    Ok(InitJobOutcome::Updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::store::{InMemoryStore, StoreOperation};

    #[test]
    fn test_token_is_stable_and_tracks_inputs() {
        let config = ControllerConfig::default();
        assert_eq!(init_token(&config), init_token(&config));
        assert_eq!(init_token(&config).len(), 64);

        let other = ControllerConfig {
            init_job_image: "busybox".to_string(),
            ..ControllerConfig::default()
        };
        assert_ne!(init_token(&config), init_token(&other));
    }

    #[test]
    fn test_job_shape() {
        let job = build_init_job(&ControllerConfig::default());
        assert_eq!(job.metadata.name.as_deref(), Some("pg"));
        assert_eq!(job.metadata.namespace.as_deref(), Some("default"));
        assert!(job.metadata.owner_references.is_none());

        let pod = job.spec.unwrap().template.spec.unwrap();
        assert_eq!(pod.restart_policy.as_deref(), Some("Never"));
        assert_eq!(pod.containers.len(), 1);
        assert_eq!(pod.containers[0].image.as_deref(), Some("bash"));
        assert_eq!(
            pod.containers[0].command.as_deref(),
            Some(
                &[
                    "/bin/sh".to_string(),
                    "-c".to_string(),
                    "date; echo Hello from the Kubernetes cluster".to_string()
                ][..]
            )
        );
    }

    #[tokio::test]
    async fn test_created_then_already_initialized() {
        let store = InMemoryStore::new();
        let config = ControllerConfig::default();
        assert_eq!(
            ensure_init_job(&store, &config).await.unwrap(),
            InitJobOutcome::Created
        );
        store.clear_writes();
        assert_eq!(
            ensure_init_job(&store, &config).await.unwrap(),
            InitJobOutcome::AlreadyInitialized
        );
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_create_conflict_is_absorbed() {
        let store = InMemoryStore::new();
        store.conflict_on_create("Job");
        assert_eq!(
            ensure_init_job(&store, &ControllerConfig::default())
                .await
                .unwrap(),
            InitJobOutcome::AlreadyInitialized
        );
    }

    #[tokio::test]
    async fn test_stale_token_refreshes_metadata_only() {
        let store = InMemoryStore::new();
        let config = ControllerConfig::default();
        let mut stale = build_init_job(&config);
        stale.metadata.annotations = None;
        if let Some(pod) = stale.spec.as_mut().and_then(|s| s.template.spec.as_mut()) {
            pod.containers[0].image = Some("old-image".to_string());
        }
        store.seed(&stale).unwrap();

        assert_eq!(
            ensure_init_job(&store, &config).await.unwrap(),
            InitJobOutcome::Updated
        );
        let job: Job = store.get("pg", "default").await.unwrap().unwrap();
        assert_eq!(stored_token(&job), Some(init_token(&config).as_str()));
        let pod = job.spec.unwrap().template.spec.unwrap();
        assert_eq!(pod.containers[0].image.as_deref(), Some("old-image"));
    }

    #[tokio::test]
    async fn test_other_store_failures_surface() {
        let store = InMemoryStore::new();
        store.fail_on(StoreOperation::Create, "Job");
        assert!(ensure_init_job(&store, &ControllerConfig::default())
            .await
            .is_err());
    }
}
