//! Record Schema
//!
//! The stored entity shape: one document per record, `{ key, value }`,
//! unique on `key`. Each store instance owns its own schema value; there is
//! no process-wide registry keyed by collection name.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BackendError, BackendResult};

/// A single stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValueRecord {
    /// Unique key within the collection
    pub key: String,

    /// Arbitrary structured payload
    pub value: Value,
}

impl KeyValueRecord {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Per-instance schema definition for a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    /// Collection the schema is bound to
    collection: String,
}

impl RecordSchema {
    /// Field holding the unique key
    pub const KEY_FIELD: &'static str = "key";

    /// Field holding the payload
    pub const VALUE_FIELD: &'static str = "value";

    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Check a key against the schema (required, non-empty)
    pub fn validate_key(&self, key: &str) -> BackendResult<()> {
        if key.is_empty() {
            return Err(BackendError::Validation(format!(
                "{}.{} is required",
                self.collection,
                Self::KEY_FIELD
            )));
        }
        Ok(())
    }

    /// Check a full record against the schema (value required, non-null)
    pub fn validate(&self, record: &KeyValueRecord) -> BackendResult<()> {
        self.validate_key(&record.key)?;
        if record.value.is_null() {
            return Err(BackendError::Validation(format!(
                "{}.{} is required for key '{}'",
                self.collection,
                Self::VALUE_FIELD,
                record.key
            )));
        }
        Ok(())
    }

    /// Check that a collection name is usable
    pub fn validate_collection(&self) -> BackendResult<()> {
        let name = &self.collection;
        if name.is_empty()
            || name.contains(['/', '\\', '\0'])
            || name == "."
            || name == ".."
        {
            return Err(BackendError::Validation(format!(
                "Invalid collection name '{}'",
                name
            )));
        }
        Ok(())
    }
}
