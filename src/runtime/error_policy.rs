//! # Error Policy
//!
//! Turns a failed reconciliation into a delayed retry.

use crate::controller::error::ReconcilerError;
use crate::controller::store::ResourceStore;
use crate::crd::ECommerceApplication;
use crate::observability::metrics;
use crate::runtime::context::{resource_key, Context};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info};

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per resource so one failing application does not
/// slow down the others.
pub fn error_policy<S: ResourceStore>(
    app: Arc<ECommerceApplication>,
    error: &ReconcilerError,
    ctx: Arc<Context<S>>,
) -> Action {
    let name = app.name_any();
    let namespace = app.namespace().unwrap_or_default();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.reconciliation_error",
        resource.name = %name,
        resource.namespace = %namespace,
        reason = error.reason(),
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}/{}: {}", namespace, name, error);
    metrics::increment_reconciliation_errors(error.reason());

    let backoff = ctx.next_backoff(&resource_key(&app));
    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::from_std(backoff).unwrap_or_else(|_| chrono::Duration::zero());
    info!(
        "Retrying with Fibonacci backoff: {}s, next attempt at {}",
        backoff.as_secs(),
        next_trigger_time.to_rfc3339()
    );

    metrics::increment_requeues("error-backoff");
    Action::requeue(backoff)
}
