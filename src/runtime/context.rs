//! # Controller Context
//!
//! State shared by every reconciliation the controller runs, and the adapter
//! from a watch trigger to [`Reconciler::reconcile`].

use crate::controller::backoff::FibonacciBackoff;
use crate::controller::error::ReconcilerError;
use crate::controller::reconcile::{Decision, Reconciler};
use crate::controller::store::ResourceStore;
use crate::crd::ECommerceApplication;
use crate::observability::metrics;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

pub struct Context<S> {
    pub reconciler: Reconciler<S>,
    // Backoff state per resource (identified by namespace/name)
    backoff_states: Mutex<HashMap<String, FibonacciBackoff>>,
}

impl<S> std::fmt::Debug for Context<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("reconciler", &self.reconciler)
            .finish_non_exhaustive()
    }
}

impl<S: ResourceStore> Context<S> {
    #[must_use]
    pub fn new(reconciler: Reconciler<S>) -> Self {
        Self {
            reconciler,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Advance and return the error backoff of `key`
    pub fn next_backoff(&self, key: &str) -> Duration {
        let config = self.reconciler.config();
        let mut states = self
            .backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        states
            .entry(key.to_string())
            .or_insert_with(|| {
                FibonacciBackoff::new(config.error_backoff_min_secs, config.error_backoff_max_secs)
            })
            .next_backoff()
    }

    /// Restart the error backoff of `key` after a successful run
    pub fn reset_backoff(&self, key: &str) {
        if let Some(backoff) = self
            .backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(key)
        {
            backoff.reset();
        }
    }
}

pub(crate) fn resource_key(app: &ECommerceApplication) -> String {
    format!("{}/{}", app.namespace().unwrap_or_default(), app.name_any())
}

impl From<Decision> for Action {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Done => Action::await_change(),
            Decision::RequeueAfter(delay, _) => Action::requeue(delay),
        }
    }
}

/// Reconcile one triggered application
///
/// # Errors
///
/// Returns the reconciliation error for the error policy to schedule a retry.
pub async fn reconcile<S: ResourceStore>(
    app: Arc<ECommerceApplication>,
    ctx: Arc<Context<S>>,
) -> Result<Action, ReconcilerError> {
    let name = app.name_any();
    let namespace = app.namespace().unwrap_or_default();
    metrics::increment_reconciliations();

    let started = Instant::now();
    let result = ctx.reconciler.reconcile(&name, &namespace).await;
    metrics::observe_reconciliation_duration(started.elapsed().as_secs_f64());

    let decision = result?;
    ctx.reset_backoff(&resource_key(&app));
    if let Decision::RequeueAfter(delay, reason) = decision {
        debug!(
            resource.name = %name,
            resource.namespace = %namespace,
            reason = reason.as_str(),
            delay_secs = delay.as_secs(),
            "Requeue scheduled"
        );
        metrics::increment_requeues(reason.as_str());
    }
    Ok(decision.into())
}
