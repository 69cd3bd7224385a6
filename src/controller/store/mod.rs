//! # Resource Store
//!
//! The store capability the reconciliation loop runs against.
//!
//! - `cluster`: backed by the Kubernetes API server
//! - `memory`: in-process store with a write log and failure injection

mod cluster;
mod memory;

pub use cluster::KubeStore;
pub use memory::{InMemoryStore, StoreOperation, WriteRecord};

use crate::controller::error::StoreError;
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

/// Namespaced resource type the store can persist
pub trait StoredResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> StoredResource for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Get/create/update primitives over namespaced resources
///
/// Failures are reported, never retried here.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch a resource, `None` when it does not exist
    async fn get<K: StoredResource>(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<K>, StoreError>;

    /// Create a resource
    ///
    /// Fails with [`StoreError::AlreadyExists`] when the name is taken.
    async fn create<K: StoredResource>(&self, resource: &K) -> Result<K, StoreError>;

    /// Replace a resource
    ///
    /// A `resourceVersion` on the input is used for optimistic concurrency.
    async fn update<K: StoredResource>(&self, resource: &K) -> Result<K, StoreError>;
}

/// Name and namespace of a resource about to be written
pub(crate) fn identity<K: StoredResource>(resource: &K) -> Result<(String, String), StoreError> {
    let meta = resource.meta();
    let name = meta
        .name
        .clone()
        .ok_or(StoreError::MissingMetadata("name"))?;
    let namespace = meta
        .namespace
        .clone()
        .ok_or(StoreError::MissingMetadata("namespace"))?;
    Ok((name, namespace))
}
