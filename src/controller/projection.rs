//! # Secret Projection
//!
//! Derives the four credential secrets consumed by the service pods from a
//! [`ConnectionDescriptor`].
//!
//! | Secret                      | Key                         | Value                      |
//! |-----------------------------|-----------------------------|----------------------------|
//! | `postgres.username`         | `POSTGRES_USERNAME`         | user name                  |
//! | `postgres.password`         | `POSTGRES_PASSWORD`         | password                   |
//! | `postgres.certificate-data` | `POSTGRES_CERTIFICATE_DATA` | decoded CA certificate     |
//! | `postgres.url`              | `POSTGRES_URL`              | JDBC URL of first endpoint |
//!
//! Projection is pure and completes before anything is written, so a failure
//! leaves the store untouched.

use crate::constants::{
    CERTIFICATE_SECRET_KEY, CERTIFICATE_SECRET_NAME, JDBC_URL_QUERY, MANAGED_BY_LABEL_VALUE,
    PASSWORD_SECRET_KEY, PASSWORD_SECRET_NAME, URL_SECRET_KEY, URL_SECRET_NAME,
    USERNAME_SECRET_KEY, USERNAME_SECRET_NAME,
};
use crate::controller::binding::ConnectionDescriptor;
use crate::controller::error::ProjectionError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;

/// One projected credential: a single string value under a single key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSecret {
    pub name: String,
    pub namespace: String,
    pub key: String,
    pub value: String,
}

impl NormalizedSecret {
    fn new(name: &str, namespace: &str, key: &str, value: String) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            key: key.to_string(),
            value,
        }
    }

    /// Render as an `Opaque`, mutable Kubernetes Secret
    ///
    /// Identical input always renders identical content.
    #[must_use]
    pub fn to_secret(&self) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                namespace: Some(self.namespace.clone()),
                labels: Some(BTreeMap::from([(
                    "app.kubernetes.io/managed-by".to_string(),
                    MANAGED_BY_LABEL_VALUE.to_string(),
                )])),
                ..Default::default()
            },
            type_: Some("Opaque".to_string()),
            immutable: Some(false),
            data: Some(BTreeMap::from([(
                self.key.clone(),
                ByteString(self.value.as_bytes().to_vec()),
            )])),
            ..Default::default()
        }
    }
}

/// Derive the four credential secrets for `namespace`
///
/// Only the first endpoint contributes to the URL.
///
/// # Errors
///
/// - [`ProjectionError::CertificateDecode`] when the certificate is not base64
/// - [`ProjectionError::CertificateEncoding`] when the decoded certificate is not UTF-8
/// - [`ProjectionError::NoEndpoints`] when the descriptor lists no endpoint
pub fn project_secrets(
    descriptor: &ConnectionDescriptor,
    namespace: &str,
) -> Result<[NormalizedSecret; 4], ProjectionError> {
    let certificate = String::from_utf8(STANDARD.decode(&descriptor.certificate_base64)?)?;

    let endpoint = descriptor
        .endpoints
        .first()
        .ok_or(ProjectionError::NoEndpoints)?;
    let url = format!(
        "jdbc:postgresql://{}:{}/{}{JDBC_URL_QUERY}",
        endpoint.hostname, endpoint.port, descriptor.database
    );

    Ok([
        NormalizedSecret::new(
            USERNAME_SECRET_NAME,
            namespace,
            USERNAME_SECRET_KEY,
            descriptor.username.clone(),
        ),
        NormalizedSecret::new(
            PASSWORD_SECRET_NAME,
            namespace,
            PASSWORD_SECRET_KEY,
            descriptor.password.clone(),
        ),
        NormalizedSecret::new(
            CERTIFICATE_SECRET_NAME,
            namespace,
            CERTIFICATE_SECRET_KEY,
            certificate,
        ),
        NormalizedSecret::new(URL_SECRET_NAME, namespace, URL_SECRET_KEY, url),
    ])
}
