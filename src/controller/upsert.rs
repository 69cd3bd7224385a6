//! # Upsert
//!
//! Create-if-absent, else overwrite.
//!
//! The existing record is never diffed against the desired one: when present
//! it is replaced in full. The replacement carries no `resourceVersion`, so the
//! write is unconditional and the last writer wins. A create that loses a race
//! with a concurrent writer falls through to the same overwrite.

use crate::controller::error::StoreError;
use crate::controller::store::{ResourceStore, StoredResource};
use crate::observability::metrics;
use kube::Resource;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

impl UpsertOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertOutcome::Created => "create",
            UpsertOutcome::Updated => "update",
        }
    }
}

/// Create `desired`, or overwrite the existing record of the same name
///
/// # Errors
///
/// Any store failure is returned unchanged.
pub async fn upsert<S, K>(store: &S, desired: &K) -> Result<UpsertOutcome, StoreError>
where
    S: ResourceStore + ?Sized,
    K: StoredResource,
{
    let meta = desired.meta();
    let name = meta
        .name
        .as_deref()
        .ok_or(StoreError::MissingMetadata("name"))?;
    let namespace = meta
        .namespace
        .as_deref()
        .ok_or(StoreError::MissingMetadata("namespace"))?;
    let kind = K::kind(&());

    let exists = store.get::<K>(name, namespace).await?.is_some();
    let outcome = if exists {
        overwrite(store, desired).await?
    } else {
        match store.create(desired).await {
            Ok(_) => UpsertOutcome::Created,
            Err(e) if e.is_already_exists() => {
                debug!(
                    kind = %kind,
                    name = %name,
                    namespace = %namespace,
                    "Created concurrently, overwriting"
                );
                overwrite(store, desired).await?
            }
            Err(e) => return Err(e),
        }
    };

    debug!(
        kind = %kind,
        name = %name,
        namespace = %namespace,
        operation = outcome.as_str(),
        "Upserted resource"
    );
    metrics::increment_resource_writes(&kind, outcome.as_str());
    Ok(outcome)
}

async fn overwrite<S, K>(store: &S, desired: &K) -> Result<UpsertOutcome, StoreError>
where
    S: ResourceStore + ?Sized,
    K: StoredResource,
{
    let mut replacement = desired.clone();
    replacement.meta_mut().resource_version = None;
    store.update(&replacement).await?;
    Ok(UpsertOutcome::Updated)
}
