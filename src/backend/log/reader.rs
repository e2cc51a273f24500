//! Log Reader
//!
//! Reads framed entries from a log file, classifying each frame.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::BackendResult;

use super::{LogEntry, HEADER_SIZE, MAX_ENTRY_SIZE};

/// What the reader found at the current position
#[derive(Debug)]
pub enum ReadOutcome {
    /// A valid entry
    Entry(LogEntry),

    /// A complete frame whose CRC or body did not check out; skipped
    Corrupt { offset: u64, lsn: u64 },

    /// An incomplete or implausible frame; nothing after `offset` is trusted
    Torn { offset: u64 },

    /// Clean end of file
    End,
}

/// Reads entries from a log file
pub struct LogReader {
    reader: BufReader<File>,

    /// Byte offset of the next frame
    position: u64,
}

impl LogReader {
    /// Open a log file for reading
    pub fn open(path: &Path) -> BackendResult<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next frame
    pub fn next_entry(&mut self) -> BackendResult<ReadOutcome> {
        let offset = self.position;

        let mut header = [0u8; HEADER_SIZE];
        match read_full(&mut self.reader, &mut header)? {
            0 => return Ok(ReadOutcome::End),
            n if n < HEADER_SIZE => return Ok(ReadOutcome::Torn { offset }),
            _ => {}
        }

        let lsn = u64::from_le_bytes(header[0..8].try_into().unwrap_or_default());
        let crc = u32::from_le_bytes(header[8..12].try_into().unwrap_or_default());
        let len = u32::from_le_bytes(header[12..16].try_into().unwrap_or_default());

        if len > MAX_ENTRY_SIZE {
            return Ok(ReadOutcome::Torn { offset });
        }

        let mut body = vec![0u8; len as usize];
        if read_full(&mut self.reader, &mut body)? < body.len() {
            return Ok(ReadOutcome::Torn { offset });
        }
        self.position += (HEADER_SIZE + body.len()) as u64;

        if LogEntry::compute_crc(lsn, &body) != crc {
            return Ok(ReadOutcome::Corrupt { offset, lsn });
        }

        match LogEntry::deserialize(&body) {
            Ok(entry) if entry.lsn == lsn => Ok(ReadOutcome::Entry(entry)),
            _ => Ok(ReadOutcome::Corrupt { offset, lsn }),
        }
    }

    /// Byte offset of the next frame
    pub fn position(&self) -> u64 {
        self.position
    }
}

/// Read until `buf` is full or EOF; returns bytes read
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> BackendResult<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
