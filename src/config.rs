//! Configuration for DocKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a DocKV store instance
#[derive(Debug, Clone)]
pub struct StoreConfig {
    // -------------------------------------------------------------------------
    // Connection Configuration
    // -------------------------------------------------------------------------
    /// Backing store address: `<scheme>://<host>[:<port>]/<database>`
    pub uri: String,

    /// Collection (record set) this instance targets
    pub collection: String,

    /// Rewrite the address host to this machine on the default port
    pub use_local_host: bool,

    // -------------------------------------------------------------------------
    // Error Policy Configuration
    // -------------------------------------------------------------------------
    /// Log and continue disconnected when `start()` fails
    pub ignore_connection_error: bool,

    /// Log and return a safe default when an operation fails
    pub ignore_operation_error: bool,

    /// Permission gate for `clear()`
    pub allow_destructive_clear: bool,

    // -------------------------------------------------------------------------
    // Log Backend Configuration
    // -------------------------------------------------------------------------
    /// Root directory for log-backed collections
    /// Internal structure:
    ///   {data_dir}/
    ///     └── {database}/
    ///           └── {collection}.log
    pub data_dir: PathBuf,

    /// How often the log backend fsyncs
    pub sync_strategy: SyncStrategy,
}

/// Log sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "dockv://localhost:27017/dockv".to_string(),
            collection: "kv".to_string(),
            use_local_host: false,
            ignore_connection_error: false,
            ignore_operation_error: false,
            allow_destructive_clear: false,
            data_dir: PathBuf::from("./dockv_data"),
            sync_strategy: SyncStrategy::EveryNEntries { count: 100 },
        }
    }
}

impl StoreConfig {
    /// Create a new config builder
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }
}

/// Builder for StoreConfig
#[derive(Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Set the backing store address
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.config.uri = uri.into();
        self
    }

    /// Set the target collection
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.config.collection = collection.into();
        self
    }

    /// Rewrite the address to point at this machine
    pub fn use_local_host(mut self, enabled: bool) -> Self {
        self.config.use_local_host = enabled;
        self
    }

    /// Soft-fail connection errors
    pub fn ignore_connection_error(mut self, enabled: bool) -> Self {
        self.config.ignore_connection_error = enabled;
        self
    }

    /// Soft-fail operation errors
    pub fn ignore_operation_error(mut self, enabled: bool) -> Self {
        self.config.ignore_operation_error = enabled;
        self
    }

    /// Soft-fail both connection and operation errors
    pub fn ignore_errors(self, enabled: bool) -> Self {
        self.ignore_connection_error(enabled)
            .ignore_operation_error(enabled)
    }

    /// Allow `clear()` to erase the collection
    pub fn allow_destructive_clear(mut self, enabled: bool) -> Self {
        self.config.allow_destructive_clear = enabled;
        self
    }

    /// Set the log backend root directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the log backend sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> StoreConfig {
        self.config
    }
}
