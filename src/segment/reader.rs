//! Segment Reader
//!
//! Random-access and whole-file reads of one segment.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{CaskError, Result};

use super::iterator::SegmentIterator;
use super::record::{Record, HEADER_SIZE};
use super::SegmentId;

/// Read handle for a segment file
///
/// The file handle sits behind a mutex so a shared reader can serve
/// concurrent `get` calls; each read is one seek plus one `read_exact`.
pub struct SegmentReader {
    id: SegmentId,
    path: PathBuf,
    file: Mutex<File>,
}

impl SegmentReader {
    /// Open the segment `id` inside `dir`
    pub fn open(dir: &Path, id: SegmentId) -> Result<Self> {
        let path = id.path_in(dir);
        let file = File::open(&path)?;

        Ok(Self {
            id,
            path,
            file: Mutex::new(file),
        })
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file length in bytes
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.lock().metadata()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Read the entire segment (for replay and merge)
    pub fn read_all(&self) -> Result<Vec<u8>> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(0))?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Iterate over `bytes` previously returned by [`SegmentReader::read_all`]
    pub fn records<'a>(&self, bytes: &'a [u8]) -> SegmentIterator<'a> {
        SegmentIterator::new(self.id, bytes)
    }

    /// Raw bytes at `offset`, without checksum verification
    pub fn read_value_at(&self, offset: u64, size: u32) -> Result<Vec<u8>> {
        self.read_exact_at(offset, size as usize)
    }

    /// Read and verify the whole record holding `key`'s value
    ///
    /// `value_offset` and `value_size` come from the keydir; the record
    /// starts `HEADER_SIZE + key.len()` bytes before the value.
    pub fn read_value(&self, key: &[u8], value_offset: u64, value_size: u32) -> Result<Vec<u8>> {
        let prefix = (HEADER_SIZE + key.len()) as u64;
        let record_offset = value_offset.checked_sub(prefix).ok_or_else(|| {
            CaskError::Storage(format!(
                "value offset {} in {} is inside the record header",
                value_offset, self.id
            ))
        })?;

        let record_len = prefix as usize + value_size as usize;
        let bytes = self.read_exact_at(record_offset, record_len)?;

        let record = Record::decode(&bytes).map_err(|e| {
            tracing::error!(segment = %self.id, offset = record_offset, error = %e, "Unreadable record");
            self.corrupt(record_offset)
        })?;

        if record.key != key || record.value.len() != value_size as usize {
            tracing::error!(segment = %self.id, offset = record_offset, "Record does not match keydir entry");
            return Err(self.corrupt(record_offset));
        }

        Ok(record.value)
    }

    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn corrupt(&self, offset: u64) -> CaskError {
        CaskError::CorruptRecord {
            segment: self.id.to_string(),
            offset,
        }
    }
}

impl std::fmt::Debug for SegmentReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentReader")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish()
    }
}

