//! Store Module
//!
//! The key-value facade over a document collection.
//!
//! ## Responsibilities
//! - Normalize keys to strings and values to JSON
//! - Route every operation through the error policy
//! - Gate `clear()` behind the destructive-clear permission
//! - Materialize snapshots and run the post-load transform

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::address::StoreAddress;
use crate::backend::{Connector, DocumentCollection, LogConnector, MemoryConnector};
use crate::config::StoreConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::error::{BackendError, BackendResult, DocKvError, Result};
use crate::policy::ErrorPolicy;
use crate::schema::{KeyValueRecord, RecordSchema};
use crate::transform::{build_snapshot, Identity, PreProcess, Snapshot};

/// Scheme served by the in-memory backend
pub const MEMORY_SCHEME: &str = "memory";

/// Scheme served by the log backend
pub const LOG_SCHEME: &str = "dockv";

/// A persistent key-value store over one document collection
///
/// ## Concurrency
/// All methods take `&self`. Operations are independent requests against
/// the backend; the store takes no lock spanning an operation, so unrelated
/// requests run concurrently and concurrent puts to one key are resolved
/// by the backend (last write wins).
///
/// ## Example
/// ```ignore
/// let store = DocStore::open(
///     StoreConfig::builder()
///         .uri("memory://localhost/app")
///         .collection("settings")
///         .build(),
/// )?;
/// store.start().await?;
///
/// store.put("theme", json!({ "dark": true })).await?;
/// assert_eq!(store.get("theme").await?, Some(json!({ "dark": true })));
/// ```
pub struct DocStore {
    config: StoreConfig,
    schema: RecordSchema,
    connection: ConnectionManager,
    policy: ErrorPolicy,
    transform: Arc<dyn PreProcess>,
}

impl DocStore {
    /// Create a store, picking the backend from the URI scheme
    ///
    /// - `memory://...`: a private in-memory cluster
    /// - `dockv://...`: the log backend under `config.data_dir`
    pub fn open(config: StoreConfig) -> Result<Self> {
        let address = ConnectionManager::resolve_address(&config)?;

        let connector: Arc<dyn Connector> = match address.scheme.as_str() {
            MEMORY_SCHEME => Arc::new(MemoryConnector::new()),
            LOG_SCHEME => Arc::new(LogConnector::new(&config.data_dir, config.sync_strategy)),
            other => {
                return Err(DocKvError::Config(format!(
                    "Unsupported store scheme '{}'",
                    other
                )))
            }
        };

        Self::with_connector(config, connector)
    }

    /// Create a store over an explicit connector
    pub fn with_connector(config: StoreConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        let schema = RecordSchema::new(config.collection.clone());
        let connection = ConnectionManager::new(&config, connector)?;
        let policy = ErrorPolicy::new(config.ignore_operation_error);

        Ok(Self {
            config,
            schema,
            connection,
            policy,
            transform: Arc::new(Identity),
        })
    }

    /// Install the transform applied by [`load`](Self::load)
    pub fn with_transform(mut self, transform: impl PreProcess + 'static) -> Self {
        self.transform = Arc::new(transform);
        self
    }

    /// Establish the backend link
    pub async fn start(&self) -> Result<()> {
        self.connection.start(&self.schema).await
    }

    /// Flush the backend and drop the link
    pub async fn close(&self) -> Result<()> {
        self.policy.guard("close", self.connection.close()).await
    }

    // =========================================================================
    // Key-Value Operations
    // =========================================================================

    /// Get the value stored under `key`
    pub async fn get(&self, key: impl ToString) -> Result<Option<Value>> {
        let key = key.to_string();
        tracing::trace!(key = %key, "get");

        self.policy
            .guard("get", async { self.link()?.find_one(&key).await })
            .await
    }

    /// Get the value stored under `key`, decoded as `T`
    pub async fn get_as<T: DeserializeOwned>(&self, key: impl ToString) -> Result<Option<T>> {
        let key = key.to_string();

        self.policy
            .guard("get", async {
                let found = self.link()?.find_one(&key).await?;
                found
                    .map(serde_json::from_value::<T>)
                    .transpose()
                    .map_err(BackendError::from)
            })
            .await
    }

    /// Insert or replace the value stored under `key`
    pub async fn put(&self, key: impl ToString, value: impl Serialize) -> Result<()> {
        let key = key.to_string();
        let encoded = serde_json::to_value(value);
        tracing::trace!(key = %key, "put");

        self.policy
            .guard("put", async {
                let record = KeyValueRecord::new(key, encoded?);
                self.schema.validate(&record)?;
                self.link()?.upsert(record).await
            })
            .await
    }

    /// Delete `key`; absent keys are a no-op
    pub async fn remove(&self, key: impl ToString) -> Result<()> {
        let key = key.to_string();
        tracing::trace!(key = %key, "remove");

        self.policy
            .guard("remove", async {
                self.link()?.delete_one(&key).await.map(|_| ())
            })
            .await
    }

    /// True iff a record exists for `key`
    pub async fn contains_key(&self, key: impl ToString) -> Result<bool> {
        let key = key.to_string();

        self.policy
            .guard("contains_key", async {
                self.link()?.count(&key).await.map(|n| n > 0)
            })
            .await
    }

    /// Number of records in the collection
    pub async fn size(&self) -> Result<u64> {
        self.policy
            .guard("size", async { self.link()?.count_all().await })
            .await
    }

    /// Erase every record
    ///
    /// Fails with [`DocKvError::Permission`] unless the store was built with
    /// `allow_destructive_clear`; that failure is never softened by the
    /// error policy.
    pub async fn clear(&self) -> Result<()> {
        if !self.config.allow_destructive_clear {
            return Err(DocKvError::Permission(format!(
                "clearing collection '{}' is not allowed",
                self.schema.collection()
            )));
        }

        self.policy
            .guard("clear", async {
                self.link()?.delete_all().await.map(|removed| {
                    tracing::info!(collection = self.schema.collection(), removed, "collection cleared");
                })
            })
            .await
    }

    // =========================================================================
    // Bulk Materialization
    // =========================================================================

    /// All keys, unordered
    pub async fn keys(&self) -> Result<Vec<String>> {
        self.policy
            .guard("keys", async { self.link()?.find_keys().await })
            .await
    }

    /// All values, unordered
    pub async fn values(&self) -> Result<Vec<Value>> {
        self.policy
            .guard("values", async {
                let records = self.link()?.find_all().await?;
                Ok::<_, BackendError>(records.into_iter().map(|record| record.value).collect::<Vec<_>>())
            })
            .await
    }

    /// All records, unordered
    pub async fn entries(&self) -> Result<Vec<KeyValueRecord>> {
        self.policy
            .guard("entries", async { self.link()?.find_all().await })
            .await
    }

    /// Flat `key → value` snapshot
    pub async fn to_object(&self) -> Result<Snapshot> {
        Ok(build_snapshot(self.entries().await?))
    }

    /// Snapshot passed through the store's transform
    pub async fn load(&self) -> Result<Snapshot> {
        self.load_with(self.transform.as_ref()).await
    }

    /// Snapshot passed through `transform` instead of the store's own
    pub async fn load_with(&self, transform: &dyn PreProcess) -> Result<Snapshot> {
        let snapshot = self.to_object().await?;
        transform.pre_process(snapshot).await
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// The resolved backend address
    pub fn address(&self) -> &StoreAddress {
        self.connection.address()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    fn link(&self) -> BackendResult<Arc<dyn DocumentCollection>> {
        self.connection.link()
    }
}
