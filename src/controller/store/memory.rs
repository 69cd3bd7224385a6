//! # In-Memory Store
//!
//! [`ResourceStore`] kept in process. Resources are stored as JSON so any
//! [`StoredResource`] can be persisted. Every create and update is appended to
//! a write log, and failures can be injected per operation and kind.
//!
//! `get` and `create` yield to the scheduler first, so concurrent
//! reconciliations on one task interleave between a read and the create that
//! depends on it, as they do against the API server.

use super::{identity, ResourceStore, StoredResource};
use crate::controller::error::StoreError;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreOperation {
    Get,
    Create,
    Update,
}

impl StoreOperation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOperation::Get => "get",
            StoreOperation::Create => "create",
            StoreOperation::Update => "update",
        }
    }
}

/// One successful create or update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub operation: StoreOperation,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

type Key = (String, String, String);

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<Key, serde_json::Value>,
    writes: Vec<WriteRecord>,
    failures: BTreeSet<(StoreOperation, String)>,
    create_conflicts: BTreeSet<String>,
    next_version: u64,
}

impl State {
    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put a resource in place as an external actor would, without logging a write
    ///
    /// # Errors
    ///
    /// Fails when the resource has no name or namespace, or cannot be serialized.
    pub fn seed<K: StoredResource>(&self, resource: &K) -> Result<(), StoreError> {
        let (name, namespace) = identity(resource)?;
        let mut state = self.lock();
        let version = state.bump_version();
        let mut value = to_value(resource, "seed", &name, &namespace)?;
        set_metadata(&mut value, "resourceVersion", &version);
        state
            .objects
            .insert((K::kind(&()).to_string(), namespace, name), value);
        Ok(())
    }

    /// Make every `operation` on `kind` fail until cleared
    pub fn fail_on(&self, operation: StoreOperation, kind: &str) {
        self.lock().failures.insert((operation, kind.to_string()));
    }

    /// Make creates of `kind` report a conflict, as if a concurrent writer won the race
    pub fn conflict_on_create(&self, kind: &str) {
        self.lock().create_conflicts.insert(kind.to_string());
    }

    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.failures.clear();
        state.create_conflicts.clear();
    }

    /// Writes made so far, oldest first
    #[must_use]
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    /// Number of stored resources of `kind`
    #[must_use]
    pub fn count(&self, kind: &str) -> usize {
        self.lock()
            .objects
            .keys()
            .filter(|(k, _, _)| k == kind)
            .count()
    }

    fn check_failure<K: StoredResource>(
        state: &State,
        operation: StoreOperation,
        name: &str,
        namespace: &str,
    ) -> Result<(), StoreError> {
        let kind = K::kind(&()).to_string();
        if state.failures.contains(&(operation, kind.clone())) {
            return Err(StoreError::Operation {
                operation: operation.as_str(),
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

fn to_value<K: StoredResource>(
    resource: &K,
    operation: &'static str,
    name: &str,
    namespace: &str,
) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(resource).map_err(|e| StoreError::Operation {
        operation,
        kind: K::kind(&()).to_string(),
        namespace: namespace.to_string(),
        name: name.to_string(),
        message: e.to_string(),
    })
}

fn from_value<K: StoredResource>(
    value: serde_json::Value,
    name: &str,
    namespace: &str,
) -> Result<K, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Operation {
        operation: "get",
        kind: K::kind(&()).to_string(),
        namespace: namespace.to_string(),
        name: name.to_string(),
        message: e.to_string(),
    })
}

fn set_metadata(value: &mut serde_json::Value, field: &str, content: &str) {
    if let Some(metadata) = value
        .get_mut("metadata")
        .and_then(serde_json::Value::as_object_mut)
    {
        metadata.insert(field.to_string(), serde_json::Value::from(content));
    }
}

fn metadata_str<'a>(value: &'a serde_json::Value, field: &str) -> Option<&'a str> {
    value
        .get("metadata")
        .and_then(|m| m.get(field))
        .and_then(serde_json::Value::as_str)
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn get<K: StoredResource>(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<K>, StoreError> {
        tokio::task::yield_now().await;
        let state = self.lock();
        Self::check_failure::<K>(&state, StoreOperation::Get, name, namespace)?;
        let key = (
            K::kind(&()).to_string(),
            namespace.to_string(),
            name.to_string(),
        );
        state
            .objects
            .get(&key)
            .cloned()
            .map(|value| from_value(value, name, namespace))
            .transpose()
    }

    async fn create<K: StoredResource>(&self, resource: &K) -> Result<K, StoreError> {
        tokio::task::yield_now().await;
        let (name, namespace) = identity(resource)?;
        let kind = K::kind(&()).to_string();
        let mut state = self.lock();
        Self::check_failure::<K>(&state, StoreOperation::Create, &name, &namespace)?;

        let key = (kind.clone(), namespace.clone(), name.clone());
        if state.create_conflicts.contains(&kind) || state.objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind,
                namespace,
                name,
            });
        }

        let version = state.bump_version();
        let mut value = to_value(resource, "create", &name, &namespace)?;
        set_metadata(&mut value, "resourceVersion", &version);
        if metadata_str(&value, "uid").is_none() {
            set_metadata(&mut value, "uid", &format!("uid-{version}"));
        }
        let created = from_value(value.clone(), &name, &namespace)?;
        state.objects.insert(key, value);
        state.writes.push(WriteRecord {
            operation: StoreOperation::Create,
            kind,
            namespace,
            name,
        });
        Ok(created)
    }

    async fn update<K: StoredResource>(&self, resource: &K) -> Result<K, StoreError> {
        let (name, namespace) = identity(resource)?;
        let kind = K::kind(&()).to_string();
        let mut state = self.lock();
        Self::check_failure::<K>(&state, StoreOperation::Update, &name, &namespace)?;

        let key = (kind.clone(), namespace.clone(), name.clone());
        let conflict = |message: &str| StoreError::Operation {
            operation: "update",
            kind: kind.clone(),
            namespace: namespace.clone(),
            name: name.clone(),
            message: message.to_string(),
        };
        let Some(stored) = state.objects.get(&key) else {
            return Err(conflict("not found"));
        };
        let stored_uid = metadata_str(stored, "uid").map(str::to_string);
        if let Some(expected) = resource.meta().resource_version.as_deref() {
            if metadata_str(stored, "resourceVersion") != Some(expected) {
                return Err(conflict("resourceVersion conflict"));
            }
        }

        let version = state.bump_version();
        let mut value = to_value(resource, "update", &name, &namespace)?;
        set_metadata(&mut value, "resourceVersion", &version);
        if let Some(uid) = stored_uid {
            set_metadata(&mut value, "uid", &uid);
        }
        let updated = from_value(value.clone(), &name, &namespace)?;
        state.objects.insert(key, value);
        state.writes.push(WriteRecord {
            operation: StoreOperation::Update,
            kind,
            namespace,
            name,
        });
        Ok(updated)
    }
}
