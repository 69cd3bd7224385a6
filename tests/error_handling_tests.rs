//! # Error Handling Tests
//!
//! These tests verify:
//! - Malformed and incomplete credential bundles abort before any secret is written
//! - Store failures surface as errors and stop the run
//! - Create conflicts on the shared init job are absorbed
//! - The host error policy backs off per resource and resets on success

mod common;

use common::*;
use ecommerce_application_operator::controller::store::{InMemoryStore, StoreOperation};
use ecommerce_application_operator::prelude::*;
use ecommerce_application_operator::runtime::{error_policy, reconcile, Context};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;

fn projected_secret_count(store: &InMemoryStore) -> usize {
    // The credential source itself is a Secret too.
    store.count("Secret") - 1
}

#[tokio::test]
async fn test_malformed_payload_writes_nothing() {
    let store = store();
    seed_application(&store, 1);
    seed_source(&store, "{not json");

    let result = reconciler(&store).reconcile(APP_NAME, NAMESPACE).await;

    assert!(matches!(
        result,
        Err(ReconcilerError::Binding(BindingError::Malformed(_)))
    ));
    assert_eq!(projected_secret_count(&store), 0);
    assert_eq!(store.count("Job"), 0);
    assert_eq!(store.count("Deployment"), 0);
}

#[tokio::test]
async fn test_missing_payload_key_is_malformed() {
    let store = store();
    seed_application(&store, 1);
    let mut source = source_secret("");
    source.data = None;
    store.seed(&source).unwrap();

    assert!(matches!(
        reconciler(&store).reconcile(APP_NAME, NAMESPACE).await,
        Err(ReconcilerError::Binding(_))
    ));
}

#[tokio::test]
async fn test_empty_host_list_is_rejected() {
    let store = store();
    seed_application(&store, 1);
    seed_source(&store, &bundle(&[]));

    let result = reconciler(&store).reconcile(APP_NAME, NAMESPACE).await;

    assert!(matches!(
        result,
        Err(ReconcilerError::Projection(ProjectionError::NoEndpoints))
    ));
    assert_eq!(projected_secret_count(&store), 0);
}

#[tokio::test]
async fn test_invalid_certificate_is_rejected() {
    let store = store();
    seed_application(&store, 1);
    let payload = r#"{"postgres":{"certificate":{"certificate_base64":"%%%"},"hosts":[{"hostname":"h","port":1}]}}"#;
    seed_source(&store, payload);

    let result = reconciler(&store).reconcile(APP_NAME, NAMESPACE).await;

    assert!(matches!(
        result,
        Err(ReconcilerError::Projection(ProjectionError::CertificateDecode(_)))
    ));
    assert_eq!(projected_secret_count(&store), 0);
}

#[tokio::test]
async fn test_store_failure_stops_the_run() {
    let store = store();
    seed_application(&store, 1);
    seed_source(&store, &bundle(&[("db.local", 5432)]));
    store.fail_on(StoreOperation::Create, "Secret");

    let result = reconciler(&store).reconcile(APP_NAME, NAMESPACE).await;

    assert!(matches!(result, Err(ReconcilerError::Store(_))));
    assert_eq!(store.count("Job"), 0);
    assert_eq!(store.count("Deployment"), 0);
}

#[tokio::test]
async fn test_partial_progress_is_completed_by_next_run() {
    let store = store();
    seed_application(&store, 1);
    seed_source(&store, &bundle(&[("db.local", 5432)]));
    store.fail_on(StoreOperation::Create, "Deployment");
    let reconciler = reconciler(&store);

    assert!(reconciler.reconcile(APP_NAME, NAMESPACE).await.is_err());
    assert_eq!(projected_secret_count(&store), 4);
    assert_eq!(store.count("Job"), 1);

    store.clear_failures();
    assert_eq!(
        reconciler.reconcile(APP_NAME, NAMESPACE).await.unwrap(),
        Decision::RequeueAfter(Duration::from_secs(1), RequeueReason::WorkloadCreated)
    );
    assert_eq!(store.count("Deployment"), 1);
}

#[tokio::test]
async fn test_init_job_create_conflict_is_absorbed() {
    let store = store();
    seed_application(&store, 1);
    seed_source(&store, &bundle(&[("db.local", 5432)]));
    store.conflict_on_create("Job");

    assert!(reconciler(&store)
        .reconcile(APP_NAME, NAMESPACE)
        .await
        .is_ok());
    assert_eq!(store.count("Deployment"), 1);
}

#[tokio::test]
async fn test_error_backoff_resets_after_success() {
    let store = store();
    seed_application(&store, 1);
    seed_source(&store, &bundle(&[("db.local", 5432)]));
    store.fail_on(StoreOperation::Create, "Secret");

    let ctx = Arc::new(Context::new(reconciler(&store)));
    let app = Arc::new(application(1));

    let mut delays = Vec::new();
    for _ in 0..3 {
        let error = reconcile(Arc::clone(&app), Arc::clone(&ctx))
            .await
            .unwrap_err();
        delays.push(error_policy(Arc::clone(&app), &error, Arc::clone(&ctx)));
    }
    assert_eq!(
        delays,
        vec![
            Action::requeue(Duration::from_secs(5)),
            Action::requeue(Duration::from_secs(5)),
            Action::requeue(Duration::from_secs(10)),
        ]
    );

    store.clear_failures();
    assert_eq!(
        reconcile(Arc::clone(&app), Arc::clone(&ctx)).await.unwrap(),
        Action::requeue(Duration::from_secs(1))
    );

    store.fail_on(StoreOperation::Update, "Secret");
    let error = reconcile(Arc::clone(&app), Arc::clone(&ctx))
        .await
        .unwrap_err();
    assert_eq!(
        error_policy(app, &error, ctx),
        Action::requeue(Duration::from_secs(5))
    );
}
