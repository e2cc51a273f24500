//! Log Writer
//!
//! Handles appending entries to a collection log.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::BackendResult;

use super::{LogEntry, Operation};

/// Appends entries to the log file
pub struct LogWriter {
    path: PathBuf,
    file: File,

    /// File length up to the end of the last complete entry
    len: u64,

    /// LSN of the last entry written
    current_lsn: u64,

    sync_strategy: SyncStrategy,

    /// Entries written since the last fsync
    unsynced: usize,

    #[cfg(test)]
    faults: Faults,
}

/// Failures injected by unit tests
#[cfg(test)]
#[derive(Default)]
struct Faults {
    /// Write only this many bytes of the next frame, then fail
    short_write: Option<usize>,
    fail_truncate: bool,
}

impl LogWriter {
    /// Open or create a log file, continuing after `last_lsn`
    pub fn open(path: &Path, sync_strategy: SyncStrategy, last_lsn: u64) -> BackendResult<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        let len = file.seek(SeekFrom::End(0))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            len,
            current_lsn: last_lsn,
            sync_strategy,
            unsynced: 0,
            #[cfg(test)]
            faults: Faults::default(),
        })
    }

    /// Append an operation; returns its LSN
    ///
    /// A failed write leaves no partial frame behind.
    pub fn append(&mut self, operation: Operation) -> BackendResult<u64> {
        let lsn = self.current_lsn + 1;
        let frame = LogEntry::new(lsn, operation).serialize()?;

        if let Err(e) = self.write_frame(&frame) {
            self.discard_partial();
            return Err(e.into());
        }
        self.len += frame.len() as u64;
        self.current_lsn = lsn;
        self.unsynced += 1;

        match self.sync_strategy {
            SyncStrategy::EveryWrite => self.sync()?,
            SyncStrategy::EveryNEntries { count } => {
                if self.unsynced >= count.max(1) {
                    self.sync()?;
                }
            }
        }

        Ok(lsn)
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        #[cfg(test)]
        if let Some(written) = self.faults.short_write.take() {
            self.file.write_all(&frame[..written.min(frame.len())])?;
            return Err(io::Error::new(io::ErrorKind::Other, "injected short write"));
        }
        self.file.write_all(frame)
    }

    /// Cut the file back to the last complete entry
    fn discard_partial(&mut self) {
        let len = self.len;
        let restored = self
            .file
            .set_len(len)
            .and_then(|()| self.file.seek(SeekFrom::Start(len)).map(|_| ()));
        if let Err(e) = restored {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to discard partial log entry"
            );
        }
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> BackendResult<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Drop every entry; LSNs keep increasing
    pub fn truncate(&mut self) -> BackendResult<()> {
        #[cfg(test)]
        if self.faults.fail_truncate {
            return Err(io::Error::new(io::ErrorKind::Other, "injected truncate failure").into());
        }
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.sync_all()?;
        self.len = 0;
        self.unsynced = 0;
        Ok(())
    }

    /// LSN of the last entry written
    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sync_strategy(&self) -> SyncStrategy {
        self.sync_strategy
    }

    #[cfg(test)]
    pub(crate) fn inject_short_write(&mut self, written: usize) {
        self.faults.short_write = Some(written);
    }

    #[cfg(test)]
    pub(crate) fn inject_truncate_failure(&mut self) {
        self.faults.fail_truncate = true;
    }
}
