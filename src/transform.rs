//! Snapshots and post-load transforms
//!
//! A snapshot is a flat `key → value` map built by direct insertion, so
//! names such as `__proto__` or `constructor` are ordinary keys.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::schema::KeyValueRecord;

/// Flat associative snapshot of a collection
pub type Snapshot = Map<String, Value>;

/// Build a snapshot by inserting each entry
pub fn build_snapshot(entries: impl IntoIterator<Item = KeyValueRecord>) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for KeyValueRecord { key, value } in entries {
        snapshot.insert(key, value);
    }
    snapshot
}

/// Post-processing hook applied by `DocStore::load`
#[async_trait]
pub trait PreProcess: Send + Sync {
    async fn pre_process(&self, snapshot: Snapshot) -> Result<Snapshot>;
}

/// Returns the snapshot unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

#[async_trait]
impl PreProcess for Identity {
    async fn pre_process(&self, snapshot: Snapshot) -> Result<Snapshot> {
        Ok(snapshot)
    }
}

/// Adapts a synchronous closure into a [`PreProcess`] hook
pub struct FnTransform<F>(F);

#[async_trait]
impl<F> PreProcess for FnTransform<F>
where
    F: Fn(Snapshot) -> Result<Snapshot> + Send + Sync,
{
    async fn pre_process(&self, snapshot: Snapshot) -> Result<Snapshot> {
        (self.0)(snapshot)
    }
}

/// Wrap a closure as a transform
pub fn transform_fn<F>(f: F) -> FnTransform<F>
where
    F: Fn(Snapshot) -> Result<Snapshot> + Send + Sync,
{
    FnTransform(f)
}
