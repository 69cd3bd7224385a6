//! # Reconciliation Tests
//!
//! Drives the full reconciliation loop against the in-memory store.
//!
//! These tests verify:
//! - The wait state while the credential source is missing
//! - Secret projection, init job and workload creation on the first run
//! - Idempotence of repeated runs
//! - Replica convergence
//! - Ownership of derived resources

mod common;

use common::*;
use ecommerce_application_operator::controller::store::{InMemoryStore, StoreOperation};
use ecommerce_application_operator::prelude::*;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Secret;
use std::time::Duration;

const URL: &str =
    "jdbc:postgresql://db.local:5432/appdb?sslmode=verify-full&sslrootcert=/cloud-postgres-cert";

fn writes_of(store: &InMemoryStore, kind: &str) -> Vec<StoreOperation> {
    store
        .writes()
        .into_iter()
        .filter(|w| w.kind == kind)
        .map(|w| w.operation)
        .collect()
}

#[tokio::test]
async fn test_waits_for_missing_credential_source() {
    let store = store();
    seed_application(&store, 2);

    let decision = reconciler(&store).reconcile(APP_NAME, NAMESPACE).await.unwrap();

    assert_eq!(
        decision,
        Decision::RequeueAfter(
            Duration::from_secs(300),
            RequeueReason::CredentialSourceMissing
        )
    );
    assert!(store.writes().is_empty());
    assert_eq!(store.count("Secret"), 0);
    assert_eq!(store.count("Job"), 0);
    assert_eq!(store.count("Deployment"), 0);
}

#[tokio::test]
async fn test_first_run_provisions_everything() {
    let store = store();
    seed_application(&store, 2);
    seed_source(&store, &bundle(&[("db.local", 5432)]));

    let decision = reconciler(&store).reconcile(APP_NAME, NAMESPACE).await.unwrap();
    assert_eq!(
        decision,
        Decision::RequeueAfter(Duration::from_secs(1), RequeueReason::WorkloadCreated)
    );

    assert_eq!(
        secret_value(&store, "postgres.username", "POSTGRES_USERNAME").await.as_deref(),
        Some("u")
    );
    assert_eq!(
        secret_value(&store, "postgres.password", "POSTGRES_PASSWORD").await.as_deref(),
        Some("p")
    );
    assert_eq!(
        secret_value(&store, "postgres.certificate-data", "POSTGRES_CERTIFICATE_DATA")
            .await
            .as_deref(),
        Some("CERT")
    );
    assert_eq!(
        secret_value(&store, "postgres.url", "POSTGRES_URL").await.as_deref(),
        Some(URL)
    );

    let job: Job = store.get("pg", "default").await.unwrap().unwrap();
    assert!(job.metadata.owner_references.is_none());

    let deployment: Deployment = store.get(APP_NAME, NAMESPACE).await.unwrap().unwrap();
    let owners = deployment.metadata.owner_references.unwrap();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].kind, "ECommerceApplication");
    assert_eq!(owners[0].uid, "3f9c2a4e-app");
    assert_eq!(deployment.spec.unwrap().replicas, Some(2));
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let store = store();
    seed_application(&store, 2);
    seed_source(&store, &bundle(&[("db.local", 5432)]));
    let reconciler = reconciler(&store);

    reconciler.reconcile(APP_NAME, NAMESPACE).await.unwrap();
    let mut first: Vec<Secret> = Vec::new();
    for name in ["postgres.username", "postgres.password", "postgres.certificate-data", "postgres.url"] {
        first.push(store.get(name, NAMESPACE).await.unwrap().unwrap());
    }
    store.clear_writes();

    let decision = reconciler.reconcile(APP_NAME, NAMESPACE).await.unwrap();
    assert_eq!(decision, Decision::Done);

    // Secrets are rewritten every run, with identical content.
    assert_eq!(writes_of(&store, "Secret"), vec![StoreOperation::Update; 4]);
    assert!(writes_of(&store, "Job").is_empty());
    assert!(writes_of(&store, "Deployment").is_empty());
    for before in first {
        let name = before.metadata.name.clone().unwrap();
        let after: Secret = store.get(&name, NAMESPACE).await.unwrap().unwrap();
        assert_eq!(after.data, before.data);
        assert_eq!(after.type_, before.type_);
        assert_eq!(after.metadata.labels, before.metadata.labels);
    }
    assert_eq!(store.count("Secret"), 5);
    assert_eq!(store.count("Job"), 1);
    assert_eq!(store.count("Deployment"), 1);
}

#[tokio::test]
async fn test_url_uses_first_endpoint() {
    let store = store();
    seed_application(&store, 1);
    seed_source(&store, &bundle(&[("a", 1), ("b", 2)]));

    reconciler(&store).reconcile(APP_NAME, NAMESPACE).await.unwrap();

    assert_eq!(
        secret_value(&store, "postgres.url", "POSTGRES_URL").await.as_deref(),
        Some("jdbc:postgresql://a:1/appdb?sslmode=verify-full&sslrootcert=/cloud-postgres-cert")
    );
}

#[tokio::test]
async fn test_replica_drift_is_corrected() {
    let store = store();
    seed_application(&store, 2);
    seed_source(&store, &bundle(&[("db.local", 5432)]));
    let reconciler = reconciler(&store);
    reconciler.reconcile(APP_NAME, NAMESPACE).await.unwrap();

    seed_application(&store, 5);
    store.clear_writes();
    let decision = reconciler.reconcile(APP_NAME, NAMESPACE).await.unwrap();
    assert_eq!(
        decision,
        Decision::RequeueAfter(Duration::from_secs(60), RequeueReason::ReplicasAdjusted)
    );
    assert_eq!(writes_of(&store, "Deployment"), vec![StoreOperation::Update]);
    let deployment: Deployment = store.get(APP_NAME, NAMESPACE).await.unwrap().unwrap();
    assert_eq!(deployment.spec.unwrap().replicas, Some(5));

    store.clear_writes();
    assert_eq!(
        reconciler.reconcile(APP_NAME, NAMESPACE).await.unwrap(),
        Decision::Done
    );
    assert!(writes_of(&store, "Deployment").is_empty());
}

#[tokio::test]
async fn test_scale_to_zero() {
    let store = store();
    seed_application(&store, 3);
    seed_source(&store, &bundle(&[("db.local", 5432)]));
    let reconciler = reconciler(&store);
    reconciler.reconcile(APP_NAME, NAMESPACE).await.unwrap();

    seed_application(&store, 0);
    reconciler.reconcile(APP_NAME, NAMESPACE).await.unwrap();
    let deployment: Deployment = store.get(APP_NAME, NAMESPACE).await.unwrap().unwrap();
    assert_eq!(deployment.spec.unwrap().replicas, Some(0));
}

#[tokio::test]
async fn test_init_job_is_shared_across_tenants() {
    let store = store();
    seed_application(&store, 1);
    seed_source(&store, &bundle(&[("db.local", 5432)]));

    let mut other = application(1);
    other.metadata.namespace = Some("tenant-b".to_string());
    other.metadata.uid = Some("other-uid".to_string());
    store.seed(&other).unwrap();
    let mut other_source = source_secret(&bundle(&[("db.other", 5432)]));
    other_source.metadata.namespace = Some("tenant-b".to_string());
    store.seed(&other_source).unwrap();

    let reconciler = reconciler(&store);
    reconciler.reconcile(APP_NAME, NAMESPACE).await.unwrap();
    reconciler.reconcile(APP_NAME, "tenant-b").await.unwrap();

    assert_eq!(writes_of(&store, "Job"), vec![StoreOperation::Create]);
    assert_eq!(store.count("Job"), 1);
    assert_eq!(store.count("Deployment"), 2);
}

#[tokio::test]
async fn test_concurrent_runs_converge() {
    let store = store();
    seed_application(&store, 2);
    seed_source(&store, &bundle(&[("db.local", 5432)]));
    let first = reconciler(&store);
    let second = first.clone();

    // Both runs read before either creates, so one create per resource
    // loses the race.
    let (a, b) = tokio::join!(
        first.reconcile(APP_NAME, NAMESPACE),
        second.reconcile(APP_NAME, NAMESPACE)
    );
    let mut decisions = vec![a.unwrap(), b.unwrap()];
    decisions.sort_by_key(|d| matches!(d, Decision::Done));
    assert!(matches!(
        decisions[0],
        Decision::RequeueAfter(_, RequeueReason::WorkloadCreated)
    ));
    assert_eq!(decisions[1], Decision::Done);

    assert_eq!(writes_of(&store, "Job"), vec![StoreOperation::Create]);
    assert_eq!(writes_of(&store, "Deployment"), vec![StoreOperation::Create]);
    let secret_writes = writes_of(&store, "Secret");
    assert_eq!(
        secret_writes
            .iter()
            .filter(|op| **op == StoreOperation::Create)
            .count(),
        4
    );
    assert_eq!(
        secret_writes
            .iter()
            .filter(|op| **op == StoreOperation::Update)
            .count(),
        4
    );
    assert_eq!(
        secret_value(&store, "postgres.url", "POSTGRES_URL")
            .await
            .as_deref(),
        Some(URL)
    );
}

#[tokio::test]
async fn test_deleted_application_is_done() {
    let store = store();
    seed_source(&store, &bundle(&[("db.local", 5432)]));

    assert_eq!(
        reconciler(&store).reconcile(APP_NAME, NAMESPACE).await.unwrap(),
        Decision::Done
    );
    assert!(store.writes().is_empty());
}
