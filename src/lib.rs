//! # DocKV
//!
//! A persistent key-value facade over a document store:
//! - One `{ key, value }` document per record, unique on `key`
//! - Upsert semantics for `put`
//! - Fail-soft or fail-hard error policy
//! - `clear()` guarded by an explicit construction-time permission
//! - Snapshot materialization with a pluggable post-load transform
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         DocStore                             │
//! │     get / put / remove / contains_key / size / clear         │
//! │     keys / values / entries / to_object / load               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  every operation
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     ErrorPolicy                              │
//! │        (propagate, or log + safe default)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 ConnectionManager                            │
//! │   (address resolution, local-host substitution, link)        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Memory    │          │     Log     │
//!   │  (RwLock)   │          │ (CRC + LSN) │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod address;
pub mod schema;
pub mod backend;
pub mod connection;
pub mod policy;
pub mod transform;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BackendError, DocKvError, Result};
pub use config::{StoreConfig, SyncStrategy};
pub use schema::{KeyValueRecord, RecordSchema};
pub use transform::{PreProcess, Snapshot};
pub use store::DocStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of DocKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
