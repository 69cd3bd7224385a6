//! # Kubernetes Store
//!
//! [`ResourceStore`] over `kube::Api`.

use super::{identity, ResourceStore, StoredResource};
use crate::constants::FIELD_MANAGER;
use crate::controller::error::StoreError;
use async_trait::async_trait;
use kube::api::{Api, PostParams};
use kube::{Client, Resource};

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

fn operation_error<K: StoredResource>(
    operation: &'static str,
    name: &str,
    namespace: &str,
    err: &kube::Error,
) -> StoreError {
    StoreError::Operation {
        operation,
        kind: K::kind(&()).to_string(),
        namespace: namespace.to_string(),
        name: name.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get<K: StoredResource>(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<K>, StoreError> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| operation_error::<K>("get", name, namespace, &e))
    }

    async fn create<K: StoredResource>(&self, resource: &K) -> Result<K, StoreError> {
        let (name, namespace) = identity(resource)?;
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);
        match api.create(&Self::post_params(), resource).await {
            Ok(created) => Ok(created),
            Err(kube::Error::Api(api_err)) if api_err.code == 409 => {
                Err(StoreError::AlreadyExists {
                    kind: K::kind(&()).to_string(),
                    namespace,
                    name,
                })
            }
            Err(e) => Err(operation_error::<K>("create", &name, &namespace, &e)),
        }
    }

    async fn update<K: StoredResource>(&self, resource: &K) -> Result<K, StoreError> {
        let (name, namespace) = identity(resource)?;
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);
        api.replace(&name, &Self::post_params(), resource)
            .await
            .map_err(|e| operation_error::<K>("update", &name, &namespace, &e))
    }
}
