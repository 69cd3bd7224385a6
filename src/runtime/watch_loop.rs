//! # Watch Loop
//!
//! Controller watch loop that monitors ECommerceApplication resources, and the
//! Deployments they own, and triggers reconciliation when changes are detected.

use crate::config::ControllerConfig;
use crate::controller::server::ServerState;
use crate::controller::store::KubeStore;
use crate::crd::ECommerceApplication;
use crate::runtime::{error_policy, reconcile, Context};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{api::Api, Client};
use kube_runtime::{controller, watcher, Controller};
use std::sync::Arc;
use tracing::{debug, info, warn};

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<DynamicType = (), Scope = k8s_openapi::NamespaceResourceScope>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Run the controller until a shutdown signal is received
///
/// Readiness is reported while the watch is running.
pub async fn run_watch_loop(
    client: Client,
    context: Arc<Context<KubeStore>>,
    config: Arc<ControllerConfig>,
    server_state: Arc<ServerState>,
) {
    let namespace = config.watch_namespace.as_deref();
    let apps: Api<ECommerceApplication> = scoped_api(&client, namespace);
    let deployments: Api<Deployment> = scoped_api(&client, namespace);

    info!(
        namespace = namespace.unwrap_or("<all>"),
        concurrency = config.max_concurrent_reconciliations,
        "Starting controller watch loop..."
    );
    server_state.set_ready(true);

    Controller::new(apps, watcher::Config::default().any_semantic())
        .owns(deployments, watcher::Config::default())
        .with_config(
            controller::Config::default().concurrency(config.max_concurrent_reconciliations),
        )
        .shutdown_on_signal()
        .run(reconcile::<KubeStore>, error_policy::<KubeStore>, context)
        .for_each(|result| async move {
            match result {
                Ok((object, _action)) => {
                    debug!(
                        resource.name = %object.name,
                        resource.namespace = object.namespace.as_deref().unwrap_or(""),
                        "watch.event.success"
                    );
                }
                Err(e) => warn!("Controller stream error: {}", e),
            }
        })
        .await;

    server_state.set_ready(false);
    info!("Controller watch loop stopped");
}
