//! Log Recovery
//!
//! Rebuilds a collection from its log after a restart or crash.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::BackendResult;

use super::{LogEntry, LogReader, ReadOutcome};

/// Handles log recovery after crash
pub struct LogRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries skipped
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether a torn tail was cut off the file
    pub was_truncated: bool,
}

impl LogRecovery {
    /// Recover entries from a log file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Skip entries whose CRC does not match
    /// 3. Truncate a partial write at the end
    /// 4. Return all valid entries in order
    pub fn recover(path: &Path) -> BackendResult<(Vec<LogEntry>, RecoveryResult)> {
        let (entries, result, torn_at) = Self::scan(path)?;

        if let Some(offset) = torn_at {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(offset)?;
            file.sync_all()?;
        }

        Ok((entries, result))
    }

    /// Verify integrity of a log file without modifying it
    pub fn verify(path: &Path) -> BackendResult<RecoveryResult> {
        let (_, mut result, torn_at) = Self::scan(path)?;
        // Report what recover() would do
        result.was_truncated = torn_at.is_some();
        Ok(result)
    }

    fn scan(path: &Path) -> BackendResult<(Vec<LogEntry>, RecoveryResult, Option<u64>)> {
        let mut reader = LogReader::open(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();

        let torn_at = loop {
            match reader.next_entry()? {
                ReadOutcome::Entry(entry) => {
                    result.entries_recovered += 1;
                    result.last_lsn = result.last_lsn.max(entry.lsn);
                    entries.push(entry);
                }
                ReadOutcome::Corrupt { offset, lsn } => {
                    tracing::warn!(offset, lsn, path = %path.display(), "skipping corrupted log entry");
                    result.entries_corrupted += 1;
                }
                ReadOutcome::Torn { offset } => {
                    tracing::warn!(offset, path = %path.display(), "truncating torn log tail");
                    result.was_truncated = true;
                    break Some(offset);
                }
                ReadOutcome::End => break None,
            }
        };

        Ok((entries, result, torn_at))
    }
}
