//! # Credential Binding
//!
//! Decodes the JSON credential bundle written by the database service binding
//! into a [`ConnectionDescriptor`].
//!
//! Decoding is permissive: unknown fields are ignored, and missing or `null`
//! objects and fields decode to empty values. Ports are taken as any integer.
//! Only a payload that is not JSON, or whose JSON has the wrong shape (e.g. a
//! string where an object is expected), is rejected.

use crate::controller::error::BindingError;
use serde::{Deserialize, Deserializer};

/// Normalized view of the credential bundle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub username: String,
    pub password: String,
    /// Certificate authority, still base64 encoded
    pub certificate_base64: String,
    /// Endpoints in the order the binding lists them
    pub endpoints: Vec<Endpoint>,
    pub database: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoint {
    pub hostname: String,
    /// Taken as published; out-of-range values end up in the JDBC URL unchanged
    pub port: i64,
}

/// Decode `null` like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BindingPayload {
    #[serde(deserialize_with = "null_as_default")]
    cli: CliSection,
    #[serde(deserialize_with = "null_as_default")]
    postgres: PostgresSection,
}

/// Shell invocation details published alongside the connection data
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CliSection {
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    kind: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostgresSection {
    #[serde(deserialize_with = "null_as_default")]
    authentication: Authentication,
    #[serde(deserialize_with = "null_as_default")]
    certificate: Certificate,
    #[serde(deserialize_with = "null_as_default")]
    database: String,
    #[serde(deserialize_with = "null_as_default")]
    hosts: Vec<Host>,
    #[serde(deserialize_with = "null_as_default")]
    query_options: QueryOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Authentication {
    #[serde(deserialize_with = "null_as_default")]
    method: String,
    #[serde(deserialize_with = "null_as_default")]
    password: String,
    #[serde(deserialize_with = "null_as_default")]
    username: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Certificate {
    #[serde(deserialize_with = "null_as_default")]
    certificate_base64: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Host {
    #[serde(deserialize_with = "null_as_default")]
    hostname: String,
    #[serde(deserialize_with = "null_as_default")]
    port: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryOptions {
    #[serde(deserialize_with = "null_as_default")]
    sslmode: String,
}

/// Parse the credential bundle
///
/// # Errors
///
/// Returns [`BindingError::Malformed`] when the payload is not JSON of the
/// expected shape. An empty payload is malformed.
pub fn parse_binding(payload: &[u8]) -> Result<ConnectionDescriptor, BindingError> {
    let parsed: BindingPayload = serde_json::from_slice(payload).map_err(BindingError::Malformed)?;

    tracing::debug!(
        database = %parsed.postgres.database,
        hosts = parsed.postgres.hosts.len(),
        auth_method = %parsed.postgres.authentication.method,
        sslmode = %parsed.postgres.query_options.sslmode,
        cli_type = %parsed.cli.kind,
        "Decoded credential bundle"
    );

    let postgres = parsed.postgres;
    Ok(ConnectionDescriptor {
        username: postgres.authentication.username,
        password: postgres.authentication.password,
        certificate_base64: postgres.certificate.certificate_base64,
        endpoints: postgres
            .hosts
            .into_iter()
            .map(|host| Endpoint {
                hostname: host.hostname,
                port: host.port,
            })
            .collect(),
        database: postgres.database,
    })
}
