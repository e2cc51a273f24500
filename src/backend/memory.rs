//! In-memory backend
//!
//! HashMap-based collections behind a `parking_lot::RwLock`.
//!
//! A `MemoryCluster` plays the role of a database server: collections are
//! keyed by `(database, collection)` and every connector cloned from the
//! same cluster sees the same data. Reachability and availability switches
//! let tests exercise the error policy without a real outage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::address::StoreAddress;
use crate::error::{BackendError, BackendResult};
use crate::schema::{KeyValueRecord, RecordSchema};

use super::{Connector, DocumentCollection};

/// Shared state standing in for a database server
pub struct MemoryCluster {
    /// Collections keyed by (database, collection)
    collections: RwLock<HashMap<(String, String), Arc<MemoryCollection>>>,

    /// When false, `connect` fails
    reachable: AtomicBool,

    /// When false, every collection operation fails
    available: Arc<AtomicBool>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            reachable: AtomicBool::new(true),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Toggle whether new connections succeed
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Toggle whether operations on open collections succeed
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of collections created so far
    pub fn collection_count(&self) -> usize {
        self.collections.read().len()
    }

    fn collection(&self, database: &str, schema: &RecordSchema) -> Arc<MemoryCollection> {
        let id = (database.to_string(), schema.collection().to_string());

        if let Some(existing) = self.collections.read().get(&id) {
            return Arc::clone(existing);
        }

        let mut collections = self.collections.write();
        let collection = collections.entry(id).or_insert_with(|| {
            Arc::new(MemoryCollection {
                schema: schema.clone(),
                documents: RwLock::new(HashMap::new()),
                available: Arc::clone(&self.available),
            })
        });
        Arc::clone(collection)
    }
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

/// Connector for the in-memory backend
#[derive(Clone, Default)]
pub struct MemoryConnector {
    cluster: Arc<MemoryCluster>,
}

impl MemoryConnector {
    /// Connector over a fresh, empty cluster
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector over an existing cluster
    pub fn with_cluster(cluster: Arc<MemoryCluster>) -> Self {
        Self { cluster }
    }

    pub fn cluster(&self) -> &Arc<MemoryCluster> {
        &self.cluster
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(
        &self,
        address: &StoreAddress,
        schema: &RecordSchema,
    ) -> BackendResult<Arc<dyn DocumentCollection>> {
        if !self.cluster.reachable.load(Ordering::SeqCst) {
            return Err(BackendError::Unreachable(address.to_string()));
        }
        schema.validate_collection()?;

        let collection: Arc<dyn DocumentCollection> =
            self.cluster.collection(&address.database, schema);
        Ok(collection)
    }
}

/// One in-memory collection
pub struct MemoryCollection {
    schema: RecordSchema,
    documents: RwLock<HashMap<String, Value>>,
    available: Arc<AtomicBool>,
}

impl MemoryCollection {
    fn check_available(&self) -> BackendResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::Unreachable(format!(
                "collection '{}' is unavailable",
                self.schema.collection()
            )))
        }
    }
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    async fn find_one(&self, key: &str) -> BackendResult<Option<Value>> {
        self.check_available()?;
        Ok(self.documents.read().get(key).cloned())
    }

    async fn upsert(&self, record: KeyValueRecord) -> BackendResult<()> {
        self.check_available()?;
        self.schema.validate(&record)?;
        self.documents.write().insert(record.key, record.value);
        Ok(())
    }

    async fn delete_one(&self, key: &str) -> BackendResult<bool> {
        self.check_available()?;
        Ok(self.documents.write().remove(key).is_some())
    }

    async fn count(&self, key: &str) -> BackendResult<u64> {
        self.check_available()?;
        Ok(u64::from(self.documents.read().contains_key(key)))
    }

    async fn count_all(&self) -> BackendResult<u64> {
        self.check_available()?;
        Ok(self.documents.read().len() as u64)
    }

    async fn find_keys(&self) -> BackendResult<Vec<String>> {
        self.check_available()?;
        Ok(self.documents.read().keys().cloned().collect())
    }

    async fn find_all(&self) -> BackendResult<Vec<KeyValueRecord>> {
        self.check_available()?;
        Ok(self
            .documents
            .read()
            .iter()
            .map(|(key, value)| KeyValueRecord::new(key.clone(), value.clone()))
            .collect())
    }

    async fn delete_all(&self) -> BackendResult<u64> {
        self.check_available()?;
        let mut documents = self.documents.write();
        let removed = documents.len() as u64;
        documents.clear();
        Ok(removed)
    }
}
