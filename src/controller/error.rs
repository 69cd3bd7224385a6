//! # Errors
//!
//! Error taxonomy of the reconciliation loop.
//!
//! A missing credential source is not an error: it is reported as a timed
//! requeue by the loop itself. Everything here aborts the current run.

use thiserror::Error;

/// The credential bundle could not be decoded
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("malformed credential bundle: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// The decoded credential bundle could not be projected into secrets
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("certificate is not valid base64: {0}")]
    CertificateDecode(#[from] base64::DecodeError),
    #[error("decoded certificate is not valid UTF-8: {0}")]
    CertificateEncoding(#[from] std::string::FromUtf8Error),
    #[error("credential bundle lists no database endpoints")]
    NoEndpoints,
}

/// A get, create or update against the resource store failed
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: String,
        namespace: String,
        name: String,
    },
    #[error("{operation} {kind} {namespace}/{name} failed: {message}")]
    Operation {
        operation: &'static str,
        kind: String,
        namespace: String,
        name: String,
        message: String,
    },
    #[error("resource has no {0}")]
    MissingMetadata(&'static str),
}

impl StoreError {
    /// Check if this error reports a create conflict
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }
}

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid spec: {0}")]
    InvalidSpec(String),
}

impl ReconcilerError {
    /// Stable label used for the error metric
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcilerError::Binding(_) => "malformed-binding",
            ReconcilerError::Projection(ProjectionError::CertificateDecode(_)) => {
                "certificate-decode"
            }
            ReconcilerError::Projection(ProjectionError::CertificateEncoding(_)) => {
                "certificate-encoding"
            }
            ReconcilerError::Projection(ProjectionError::NoEndpoints) => "no-endpoints",
            ReconcilerError::Store(_) => "store",
            ReconcilerError::InvalidSpec(_) => "invalid-spec",
        }
    }
}
