//! # Workload
//!
//! Ensures the application's Deployment exists and runs `spec.size` replicas.
//!
//! Only the replica count is converged on an existing Deployment. Image,
//! labels and ports are set at creation and left alone afterwards. A create
//! that loses a race with a concurrent run converges the Deployment that run
//! created.

use crate::config::ControllerConfig;
use crate::constants::{
    MANAGED_BY_LABEL_VALUE, WORKLOAD_APP_LABEL, WORKLOAD_CONTAINER_NAME, WORKLOAD_OWNER_LABEL,
};
use crate::controller::error::ReconcilerError;
use crate::controller::store::ResourceStore;
use crate::crd::ECommerceApplication;
use crate::observability::metrics;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, ContainerPort, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadOutcome {
    Created,
    /// The replica count drifted and was corrected
    Scaled { from: Option<i32>, to: i32 },
    Unchanged,
}

/// Selector labels of the workload for `app_name`
#[must_use]
pub fn selector_labels(app_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), WORKLOAD_APP_LABEL.to_string()),
        (WORKLOAD_OWNER_LABEL.to_string(), app_name.to_string()),
    ])
}

/// Build the desired Deployment for `app`
///
/// # Errors
///
/// Fails with [`ReconcilerError::InvalidSpec`] when the application has no
/// name, namespace or uid and so cannot own the Deployment.
pub fn build_deployment(
    app: &ECommerceApplication,
    config: &ControllerConfig,
) -> Result<Deployment, ReconcilerError> {
    let name = app.name_any();
    let namespace = app
        .namespace()
        .ok_or_else(|| ReconcilerError::InvalidSpec(format!("{name} has no namespace")))?;
    let owner = app.controller_owner_ref(&()).ok_or_else(|| {
        ReconcilerError::InvalidSpec(format!("{namespace}/{name} has no uid to own the workload"))
    })?;

    let selector = selector_labels(&name);
    let mut labels = selector.clone();
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        MANAGED_BY_LABEL_VALUE.to_string(),
    );

    Ok(Deployment {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(namespace),
            labels: Some(labels),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(app.spec.size),
            selector: LabelSelector {
                match_labels: Some(selector.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: WORKLOAD_CONTAINER_NAME.to_string(),
                        image: Some(config.workload_image.clone()),
                        ports: Some(vec![ContainerPort {
                            container_port: config.workload_container_port,
                            name: Some(WORKLOAD_CONTAINER_NAME.to_string()),
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Create the Deployment, or correct its replica count
///
/// # Errors
///
/// Store failures, or [`ReconcilerError::InvalidSpec`] when the Deployment
/// has to be created for an application that cannot own it.
pub async fn ensure_workload<S>(
    store: &S,
    app: &ECommerceApplication,
    config: &ControllerConfig,
) -> Result<WorkloadOutcome, ReconcilerError>
where
    S: ResourceStore + ?Sized,
{
    let name = app.name_any();
    let namespace = app.namespace().unwrap_or_default();
    let desired = app.spec.size;

    let mut existing = match store.get::<Deployment>(&name, &namespace).await? {
        Some(existing) => existing,
        None => {
            let deployment = build_deployment(app, config)?;
            match store.create(&deployment).await {
                Ok(_) => {
                    metrics::increment_resource_writes("Deployment", "create");
                    info!(deployment = %name, namespace = %namespace, replicas = desired, "Created workload");
                    return Ok(WorkloadOutcome::Created);
                }
                Err(e) if e.is_already_exists() => {
                    debug!(deployment = %name, namespace = %namespace, "Workload created concurrently");
                    let Some(existing) = store.get::<Deployment>(&name, &namespace).await? else {
                        return Err(e.into());
                    };
                    existing
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    let current = existing.spec.as_ref().and_then(|s| s.replicas);
    if current == Some(desired) {
        return Ok(WorkloadOutcome::Unchanged);
    }

    existing.spec.get_or_insert_with(Default::default).replicas = Some(desired);
    store.update(&existing).await?;
    metrics::increment_resource_writes("Deployment", "update");
    info!(
        deployment = %name,
        namespace = %namespace,
        from = ?current,
        to = desired,
        "Scaled workload"
    );
    Ok(WorkloadOutcome::Scaled {
        from: current,
        to: desired,
    })
}
