//! # Reconciliation Loop
//!
//! Drives one `ECommerceApplication` toward its desired state.
//!
//! ## Phases
//!
//! 1. `FetchDesired` - load the application; gone means nothing to do
//! 2. `AwaitCredentialSource` - wait for the binding secret, re-entered on a timer
//! 3. `ProjectSecrets` - parse the bundle and upsert the four credential secrets
//! 4. `EnsureInitJob` - make sure the shared init Job exists
//! 5. `EnsureWorkload` - create the Deployment
//! 6. `AdjustReplicas` - correct replica drift, re-entered after a short delay
//!
//! The loop keeps no state between runs. Every run re-reads the store and
//! every write is an idempotent upsert, so a run cut short (error or
//! cancellation) leaves valid, partially converged resources that the next
//! run completes.

use crate::config::ControllerConfig;
use crate::constants::BINDING_PAYLOAD_KEY;
use crate::controller::binding::parse_binding;
use crate::controller::error::ReconcilerError;
use crate::controller::init_job::ensure_init_job;
use crate::controller::projection::project_secrets;
use crate::controller::store::ResourceStore;
use crate::controller::upsert::upsert;
use crate::controller::workload::{ensure_workload, WorkloadOutcome};
use crate::crd::ECommerceApplication;
use k8s_openapi::api::core::v1::Secret;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, Instrument};

/// What the host should do after a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Converged; wait for the next watch event
    Done,
    /// Run again after the delay
    RequeueAfter(Duration, RequeueReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeueReason {
    CredentialSourceMissing,
    WorkloadCreated,
    ReplicasAdjusted,
}

impl RequeueReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RequeueReason::CredentialSourceMissing => "credential-source-missing",
            RequeueReason::WorkloadCreated => "workload-created",
            RequeueReason::ReplicasAdjusted => "replicas-adjusted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    FetchDesired,
    AwaitCredentialSource,
    ProjectSecrets,
    EnsureInitJob,
    EnsureWorkload,
    AdjustReplicas,
}

impl Phase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::FetchDesired => "fetch-desired",
            Phase::AwaitCredentialSource => "await-credential-source",
            Phase::ProjectSecrets => "project-secrets",
            Phase::EnsureInitJob => "ensure-init-job",
            Phase::EnsureWorkload => "ensure-workload",
            Phase::AdjustReplicas => "adjust-replicas",
        }
    }
}

/// Reconciler over a [`ResourceStore`]
///
/// Holds only the store handle and immutable settings, so one instance
/// serves any number of concurrent runs.
pub struct Reconciler<S> {
    store: Arc<S>,
    config: Arc<ControllerConfig>,
}

impl<S> Clone for Reconciler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S> std::fmt::Debug for Reconciler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: ResourceStore> Reconciler<S> {
    #[must_use]
    pub fn new(store: Arc<S>, config: Arc<ControllerConfig>) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reconcile the application `namespace/name`
    ///
    /// # Errors
    ///
    /// Any failure aborts the run without advancing further. Nothing is
    /// retried here: the error goes back to the host, whose error policy
    /// schedules redelivery with backoff.
    pub async fn reconcile(&self, name: &str, namespace: &str) -> Result<Decision, ReconcilerError> {
        let span = info_span!(
            "reconcile",
            resource.name = %name,
            resource.namespace = %namespace,
            tenant = tracing::field::Empty,
            phase = tracing::field::Empty,
        );
        let mut phase = Phase::FetchDesired;
        let result = self
            .run(name, namespace, &mut phase)
            .instrument(span.clone())
            .await;

        span.in_scope(|| match &result {
            Ok(decision) => debug!(phase = phase.as_str(), ?decision, "Reconciliation finished"),
            Err(e) => error!(phase = phase.as_str(), error = %e, "Reconciliation failed"),
        });
        result
    }

    async fn run(
        &self,
        name: &str,
        namespace: &str,
        phase: &mut Phase,
    ) -> Result<Decision, ReconcilerError> {
        let span = tracing::Span::current();
        let mut enter = |next: Phase| {
            *phase = next;
            span.record("phase", next.as_str());
        };

        enter(Phase::FetchDesired);
        let Some(app) = self.store.get::<ECommerceApplication>(name, namespace).await? else {
            debug!("Application no longer exists, nothing to do");
            return Ok(Decision::Done);
        };
        span.record("tenant", app.spec.tenant_name.as_str());
        validate(&app)?;

        enter(Phase::AwaitCredentialSource);
        let source_name = app.spec.postgres_secret_name.as_str();
        let Some(source) = self.store.get::<Secret>(source_name, namespace).await? else {
            info!(
                secret = %source_name,
                retry_in_secs = self.config.credential_wait_requeue_secs,
                "Credential source secret not found yet, waiting"
            );
            return Ok(Decision::RequeueAfter(
                self.config.credential_wait_requeue(),
                RequeueReason::CredentialSourceMissing,
            ));
        };

        enter(Phase::ProjectSecrets);
        let payload = source
            .data
            .as_ref()
            .and_then(|data| data.get(BINDING_PAYLOAD_KEY))
            .map(|bytes| bytes.0.as_slice())
            .unwrap_or_default();
        let descriptor = parse_binding(payload)?;
        // Computed in full before the first write.
        let secrets = project_secrets(&descriptor, namespace)?;
        for secret in &secrets {
            upsert(self.store.as_ref(), &secret.to_secret()).await?;
        }
        debug!(count = secrets.len(), "Projected credential secrets");

        enter(Phase::EnsureInitJob);
        let init = ensure_init_job(self.store.as_ref(), &self.config).await?;
        debug!(outcome = ?init, "Init job ensured");

        enter(Phase::EnsureWorkload);
        match ensure_workload(self.store.as_ref(), &app, &self.config).await? {
            WorkloadOutcome::Created => Ok(Decision::RequeueAfter(
                self.config.workload_created_requeue(),
                RequeueReason::WorkloadCreated,
            )),
            WorkloadOutcome::Scaled { .. } => {
                enter(Phase::AdjustReplicas);
                Ok(Decision::RequeueAfter(
                    self.config.replica_drift_requeue(),
                    RequeueReason::ReplicasAdjusted,
                ))
            }
            WorkloadOutcome::Unchanged => Ok(Decision::Done),
        }
    }
}

fn validate(app: &ECommerceApplication) -> Result<(), ReconcilerError> {
    if app.spec.size < 0 {
        return Err(ReconcilerError::InvalidSpec(format!(
            "size must not be negative, got {}",
            app.spec.size
        )));
    }
    if app.spec.postgres_secret_name.trim().is_empty() {
        return Err(ReconcilerError::InvalidSpec(
            "postgresSecretName must not be empty".to_string(),
        ));
    }
    Ok(())
}
