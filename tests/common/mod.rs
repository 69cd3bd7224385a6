//! Common fixtures for reconciliation tests
//!
//! Seeds an [`InMemoryStore`] with applications and credential source secrets
//! the way the platform and the service binding would.

#![allow(dead_code, reason = "each test binary uses a subset of the fixtures")]

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ecommerce_application_operator::controller::store::InMemoryStore;
use ecommerce_application_operator::prelude::*;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const NAMESPACE: &str = "tenant-a";
pub const APP_NAME: &str = "shop";
pub const SOURCE_SECRET: &str = "tenant-a-postgres-binding";

pub fn store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new())
}

pub fn reconciler(store: &Arc<InMemoryStore>) -> Reconciler<InMemoryStore> {
    Reconciler::new(Arc::clone(store), Arc::new(ControllerConfig::default()))
}

pub fn application(size: i32) -> ECommerceApplication {
    let mut app = ECommerceApplication::new(
        APP_NAME,
        ECommerceApplicationSpec {
            size,
            postgres_secret_name: SOURCE_SECRET.to_string(),
            tenant_name: "tenant-a".to_string(),
        },
    );
    app.metadata.namespace = Some(NAMESPACE.to_string());
    app.metadata.uid = Some("3f9c2a4e-app".to_string());
    app
}

pub fn seed_application(store: &InMemoryStore, size: i32) {
    store.seed(&application(size)).unwrap();
}

/// Credential bundle with the given endpoints
pub fn bundle(hosts: &[(&str, u16)]) -> String {
    let hosts: Vec<_> = hosts
        .iter()
        .map(|(hostname, port)| serde_json::json!({"hostname": hostname, "port": port}))
        .collect();
    serde_json::json!({
        "cli": {"type": "shell", "bin": "psql"},
        "postgres": {
            "authentication": {"method": "direct", "username": "u", "password": "p"},
            "certificate": {"certificate_base64": STANDARD.encode("CERT"), "name": "ca"},
            "database": "appdb",
            "hosts": hosts,
            "query_options": {"sslmode": "verify-full"},
            "scheme": "postgres",
            "type": "uri"
        }
    })
    .to_string()
}

pub fn source_secret(payload: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(SOURCE_SECRET.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            "connection".to_string(),
            ByteString(payload.as_bytes().to_vec()),
        )])),
        ..Default::default()
    }
}

pub fn seed_source(store: &InMemoryStore, payload: &str) {
    store.seed(&source_secret(payload)).unwrap();
}

/// Value stored under `key` in the projected secret `name`
pub async fn secret_value(store: &InMemoryStore, name: &str, key: &str) -> Option<String> {
    let secret: Secret = store.get(name, NAMESPACE).await.unwrap()?;
    let bytes = secret.data?.remove(key)?;
    String::from_utf8(bytes.0).ok()
}
