//! Log Backend
//!
//! Durable collections stored as append-only logs, one file per collection.
//!
//! ## Responsibilities
//! - Append every mutation before applying it to the in-memory index
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Crash recovery and replay on open
//! - Compaction when the log is mostly superseded entries
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Entry 1                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Entry 2                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Layout
//! ```text
//! {data_dir}/{database}/{collection}.log
//! ```

mod entry;
mod reader;
mod recovery;
mod writer;

pub use entry::{LogEntry, Operation, HEADER_SIZE, MAX_ENTRY_SIZE};
pub use reader::{LogReader, ReadOutcome};
pub use recovery::{LogRecovery, RecoveryResult};
pub use writer::LogWriter;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use serde_json::Value;

use crate::address::StoreAddress;
use crate::config::SyncStrategy;
use crate::error::{BackendError, BackendResult};
use crate::schema::{KeyValueRecord, RecordSchema};

use super::{Connector, DocumentCollection};

/// Logs shorter than this are never compacted on open
const COMPACTION_MIN_ENTRIES: u64 = 1024;

/// Compact on open when entries exceed live documents by this factor
const COMPACTION_RATIO: u64 = 4;

// =============================================================================
// Connector
// =============================================================================

/// Connector for log-backed collections rooted at a data directory
///
/// Only local hosts are served. Stores sharing one connector share one
/// handle per collection; a second connector opening a collection that is
/// already open in this process is refused.
pub struct LogConnector {
    data_dir: PathBuf,
    sync_strategy: SyncStrategy,

    /// One slot per collection path; its lock is held across the open
    open: Mutex<HashMap<PathBuf, Arc<AsyncMutex<Weak<LogCollection>>>>>,
}

impl LogConnector {
    pub fn new(data_dir: impl Into<PathBuf>, sync_strategy: SyncStrategy) -> Self {
        Self {
            data_dir: data_dir.into(),
            sync_strategy,
            open: Mutex::new(HashMap::new()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the log for `collection` in `database`
    pub fn collection_path(&self, database: &str, collection: &str) -> PathBuf {
        self.data_dir
            .join(database)
            .join(format!("{}.log", collection))
    }

    fn slot(&self, path: &Path) -> Arc<AsyncMutex<Weak<LogCollection>>> {
        Arc::clone(
            self.open
                .lock()
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(AsyncMutex::new(Weak::new()))),
        )
    }
}

#[async_trait]
impl Connector for LogConnector {
    async fn connect(
        &self,
        address: &StoreAddress,
        schema: &RecordSchema,
    ) -> BackendResult<Arc<dyn DocumentCollection>> {
        if !address.is_local() {
            return Err(BackendError::Unreachable(format!(
                "log backend only serves local hosts, got '{}'",
                address.host
            )));
        }
        schema.validate_collection()?;
        if address.database == "." || address.database == ".." {
            return Err(BackendError::Validation(format!(
                "Invalid database name '{}'",
                address.database
            )));
        }

        let path = self.collection_path(&address.database, schema.collection());
        let gate = self.slot(&path);
        let mut slot = gate.lock().await;
        if let Some(existing) = slot.upgrade() {
            return Ok(existing);
        }

        let schema = schema.clone();
        let sync_strategy = self.sync_strategy;
        let collection = tokio::task::spawn_blocking(move || {
            LogCollection::open(&path, schema, sync_strategy)
        })
        .await
        .map_err(|e| BackendError::Internal(format!("log open task failed: {}", e)))??;
        let collection = Arc::new(collection);

        *slot = Arc::downgrade(&collection);
        Ok(collection)
    }
}

// =============================================================================
// Process-wide claims on open log files
// =============================================================================

fn claims() -> &'static Mutex<HashSet<PathBuf>> {
    static CLAIMS: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    CLAIMS.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Exclusive in-process ownership of a log file, released on drop
struct PathClaim {
    path: PathBuf,
}

impl PathClaim {
    fn acquire(path: &Path) -> BackendResult<Self> {
        if !claims().lock().insert(path.to_path_buf()) {
            return Err(BackendError::Validation(format!(
                "Collection log {} is already open in this process",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for PathClaim {
    fn drop(&mut self) {
        claims().lock().remove(&self.path);
    }
}

// =============================================================================
// Collection
// =============================================================================

/// A durable collection backed by one log file
pub struct LogCollection {
    schema: RecordSchema,
    state: Arc<Mutex<LogState>>,
}

struct LogState {
    writer: LogWriter,

    /// Live documents, rebuilt from the log on open
    documents: HashMap<String, Value>,

    /// Entries currently in the log file
    log_entries: u64,

    _claim: PathClaim,
}

impl LogCollection {
    /// Open or create the collection log at `path`
    ///
    /// On open:
    /// 1. Create the database directory
    /// 2. Claim the file for this process
    /// 3. Recover and replay the log if it exists
    /// 4. Compact if the log is mostly dead entries
    pub fn open(path: &Path, schema: RecordSchema, sync_strategy: SyncStrategy) -> BackendResult<Self> {
        let dir = path
            .parent()
            .ok_or_else(|| BackendError::Internal(format!("{} has no parent", path.display())))?;
        fs::create_dir_all(dir)?;

        let file_name = path
            .file_name()
            .ok_or_else(|| BackendError::Internal(format!("{} has no file name", path.display())))?;
        let path = fs::canonicalize(dir)?.join(file_name);
        let claim = PathClaim::acquire(&path)?;

        let mut documents = HashMap::new();
        let mut log_entries = 0;
        let mut last_lsn = 0;

        if path.exists() {
            let (entries, result) = LogRecovery::recover(&path)?;
            if result.entries_recovered > 0 || result.entries_corrupted > 0 {
                tracing::debug!(
                    path = %path.display(),
                    recovered = result.entries_recovered,
                    corrupted = result.entries_corrupted,
                    last_lsn = result.last_lsn,
                    truncated = result.was_truncated,
                    "log recovery complete"
                );
            }

            for entry in entries {
                apply(&mut documents, entry.operation);
            }
            log_entries = result.entries_recovered;
            last_lsn = result.last_lsn;
        }

        let writer = LogWriter::open(&path, sync_strategy, last_lsn)?;
        let mut state = LogState {
            writer,
            documents,
            log_entries,
            _claim: claim,
        };

        if state.log_entries >= COMPACTION_MIN_ENTRIES
            && state.log_entries > COMPACTION_RATIO * state.documents.len() as u64
        {
            state.compact(sync_strategy)?;
        }

        Ok(Self {
            schema,
            state: Arc::new(Mutex::new(state)),
        })
    }

    /// Rewrite the log to hold one entry per live document
    pub async fn compact(&self) -> BackendResult<()> {
        self.blocking(|state| {
            let strategy = state.writer.sync_strategy();
            state.compact(strategy)
        })
        .await
    }

    /// Entries currently in the log file
    pub fn log_entries(&self) -> u64 {
        self.state.lock().log_entries
    }

    /// Run a write against the state on the blocking pool
    async fn blocking<T, F>(&self, f: F) -> BackendResult<T>
    where
        F: FnOnce(&mut LogState) -> BackendResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(&self.state);
        tokio::task::spawn_blocking(move || f(&mut state.lock()))
            .await
            .map_err(|e| BackendError::Internal(format!("log task failed: {}", e)))?
    }
}

impl LogState {
    fn append(&mut self, operation: Operation) -> BackendResult<u64> {
        let lsn = self.writer.append(operation)?;
        self.log_entries += 1;
        Ok(lsn)
    }

    /// Log a durable Clear, empty the index, then drop the file contents
    ///
    /// Once the Clear is synced the index is emptied even if truncation
    /// fails; replay of the untruncated log reaches the same empty state.
    fn clear(&mut self) -> BackendResult<u64> {
        self.append(Operation::Clear)?;
        self.writer.sync()?;

        let removed = self.documents.len() as u64;
        self.documents.clear();

        match self.writer.truncate() {
            Ok(()) => self.log_entries = 0,
            Err(e) => tracing::warn!(
                path = %self.writer.path().display(),
                error = %e,
                "log truncate after clear failed; entries kept until compaction"
            ),
        }
        Ok(removed)
    }

    fn compact(&mut self, sync_strategy: SyncStrategy) -> BackendResult<()> {
        let path = self.writer.path().to_path_buf();
        let tmp_path = path.with_extension("log.compact");
        let start_lsn = self.writer.current_lsn();

        {
            let mut tmp = LogWriter::open(&tmp_path, SyncStrategy::EveryNEntries { count: usize::MAX }, start_lsn)?;
            tmp.truncate()?;
            for (key, value) in &self.documents {
                tmp.append(Operation::upsert(key.clone(), value)?)?;
            }
            tmp.sync()?;
        }

        fs::rename(&tmp_path, &path)?;
        let (_, result) = LogRecovery::recover(&path)?;
        self.writer = LogWriter::open(&path, sync_strategy, result.last_lsn.max(start_lsn))?;

        tracing::debug!(
            path = %path.display(),
            before = self.log_entries,
            after = result.entries_recovered,
            "log compacted"
        );
        self.log_entries = result.entries_recovered;
        Ok(())
    }
}

/// Replay one operation onto the document index
fn apply(documents: &mut HashMap<String, Value>, operation: Operation) {
    match operation {
        Operation::Upsert { key, value } => match serde_json::from_slice(&value) {
            Ok(value) => {
                documents.insert(key, value);
            }
            Err(e) => tracing::warn!(key = %key, error = %e, "skipping undecodable document"),
        },
        Operation::Delete { key } => {
            documents.remove(&key);
        }
        Operation::Clear => documents.clear(),
    }
}

#[async_trait]
impl DocumentCollection for LogCollection {
    async fn find_one(&self, key: &str) -> BackendResult<Option<Value>> {
        Ok(self.state.lock().documents.get(key).cloned())
    }

    async fn upsert(&self, record: KeyValueRecord) -> BackendResult<()> {
        self.schema.validate(&record)?;
        self.blocking(move |state| {
            state.append(Operation::upsert(record.key.clone(), &record.value)?)?;
            state.documents.insert(record.key, record.value);
            Ok(())
        })
        .await
    }

    async fn delete_one(&self, key: &str) -> BackendResult<bool> {
        let key = key.to_string();
        self.blocking(move |state| {
            if !state.documents.contains_key(&key) {
                return Ok(false);
            }
            state.append(Operation::Delete { key: key.clone() })?;
            state.documents.remove(&key);
            Ok(true)
        })
        .await
    }

    async fn count(&self, key: &str) -> BackendResult<u64> {
        Ok(u64::from(self.state.lock().documents.contains_key(key)))
    }

    async fn count_all(&self) -> BackendResult<u64> {
        Ok(self.state.lock().documents.len() as u64)
    }

    async fn find_keys(&self) -> BackendResult<Vec<String>> {
        Ok(self.state.lock().documents.keys().cloned().collect())
    }

    async fn find_all(&self) -> BackendResult<Vec<KeyValueRecord>> {
        Ok(self
            .state
            .lock()
            .documents
            .iter()
            .map(|(key, value)| KeyValueRecord::new(key.clone(), value.clone()))
            .collect())
    }

    async fn delete_all(&self) -> BackendResult<u64> {
        self.blocking(|state| state.clear()).await
    }

    async fn close(&self) -> BackendResult<()> {
        self.blocking(|state| state.writer.sync()).await
    }
}
