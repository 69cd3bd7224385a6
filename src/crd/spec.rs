//! # ECommerceApplication Spec
//!
//! Desired state of one tenant's e-commerce application.

use serde::{Deserialize, Serialize};

/// ECommerceApplication Custom Resource Definition
///
/// Declares the desired state for one tenant: how many service replicas to
/// run and which secret carries the Postgres credential bundle.
///
/// # Example
///
/// ```yaml
/// apiVersion: cache.saas.ecommerce.sample.com/v1alpha1
/// kind: ECommerceApplication
/// metadata:
///   name: tenant-a-shop
///   namespace: tenant-a
/// spec:
///   size: 2
///   postgresSecretName: tenant-a-postgres-binding
///   tenantName: tenant-a
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "ECommerceApplication",
    group = "cache.saas.ecommerce.sample.com",
    version = "v1alpha1",
    namespaced,
    shortname = "ecapp",
    printcolumn = r#"{"name":"Size", "type":"integer", "jsonPath":".spec.size"}, {"name":"Tenant", "type":"string", "jsonPath":".spec.tenantName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ECommerceApplicationSpec {
    /// Desired number of service replicas
    pub size: i32,
    /// Name of the secret (same namespace) holding the credential bundle under the `connection` key
    pub postgres_secret_name: String,
    /// Tenant the application belongs to
    #[serde(default)]
    pub tenant_name: String,
}
