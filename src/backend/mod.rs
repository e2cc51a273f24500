//! Backend Module
//!
//! The seam between the store facade and a document database.
//!
//! ## Responsibilities
//! - `Connector`: turn a resolved address into a live collection handle
//! - `DocumentCollection`: the primitives the facade needs (point lookup,
//!   atomic upsert, delete, count, scans, erase)
//! - Enforce key uniqueness and the record schema
//!
//! ## Shipped Backends
//! - `memory`: in-process collections, shareable between store instances
//! - `log`: durable append-only log per collection with crash recovery

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::address::StoreAddress;
use crate::error::BackendResult;
use crate::schema::{KeyValueRecord, RecordSchema};

pub mod log;
pub mod memory;

pub use self::log::LogConnector;
pub use self::memory::{MemoryCluster, MemoryConnector};

/// Establishes links to a document database
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open the collection named by `schema` in the database at `address`
    async fn connect(
        &self,
        address: &StoreAddress,
        schema: &RecordSchema,
    ) -> BackendResult<Arc<dyn DocumentCollection>>;
}

/// A live handle to one collection of `{ key, value }` documents
///
/// Implementations guarantee at most one document per key.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Value stored under `key`, if any
    async fn find_one(&self, key: &str) -> BackendResult<Option<Value>>;

    /// Insert or replace the document for `record.key`
    async fn upsert(&self, record: KeyValueRecord) -> BackendResult<()>;

    /// Delete the document for `key`; returns whether one existed
    async fn delete_one(&self, key: &str) -> BackendResult<bool>;

    /// Number of documents matching `key` (0 or 1)
    async fn count(&self, key: &str) -> BackendResult<u64>;

    /// Number of documents in the collection
    async fn count_all(&self) -> BackendResult<u64>;

    /// All keys, unordered
    async fn find_keys(&self) -> BackendResult<Vec<String>>;

    /// All documents, unordered
    async fn find_all(&self) -> BackendResult<Vec<KeyValueRecord>>;

    /// Delete every document; returns how many were removed
    async fn delete_all(&self) -> BackendResult<u64>;

    /// Release resources (flush pending writes)
    async fn close(&self) -> BackendResult<()> {
        Ok(())
    }
}
