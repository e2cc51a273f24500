//! Log entry definitions
//!
//! Defines the structure of individual log entries and their framing.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BackendError, BackendResult};

/// Frame header: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest body accepted when reading (64 MB)
pub const MAX_ENTRY_SIZE: u32 = 64 * 1024 * 1024;

/// A single entry in the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The mutation recorded by this entry
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Mutations that can be logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Insert or replace a document; `value` is JSON-encoded
    Upsert { key: String, value: Vec<u8> },

    /// Delete a document
    Delete { key: String },

    /// Delete every document
    Clear,
}

impl Operation {
    /// Build an upsert, encoding the value as JSON
    pub fn upsert(key: impl Into<String>, value: &Value) -> BackendResult<Self> {
        Ok(Operation::Upsert {
            key: key.into(),
            value: serde_json::to_vec(value)?,
        })
    }
}

impl LogEntry {
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Encode as a framed record: `[lsn][crc][len][body]`
    pub fn serialize(&self) -> BackendResult<Bytes> {
        let body = bincode::serialize(self)?;
        if body.len() > MAX_ENTRY_SIZE as usize {
            return Err(BackendError::Serialization(format!(
                "Log entry too large: {} bytes (max {})",
                body.len(),
                MAX_ENTRY_SIZE
            )));
        }

        let crc = Self::compute_crc(self.lsn, &body);

        let mut frame = BytesMut::with_capacity(HEADER_SIZE + body.len());
        frame.put_u64_le(self.lsn);
        frame.put_u32_le(crc);
        frame.put_u32_le(body.len() as u32);
        frame.put_slice(&body);
        Ok(frame.freeze())
    }

    /// Decode a body that has already passed its CRC check
    pub fn deserialize(body: &[u8]) -> BackendResult<Self> {
        Ok(bincode::deserialize(body)?)
    }

    /// CRC32 over the LSN and the body
    pub fn compute_crc(lsn: u64, body: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&lsn.to_le_bytes());
        hasher.update(body);
        hasher.finalize()
    }
}
