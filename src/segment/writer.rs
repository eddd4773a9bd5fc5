//! Segment Writer
//!
//! Appends encoded records to a segment file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::{CaskError, Result};

use super::record::Record;
use super::SegmentId;

/// Append-only writer for one segment
///
/// Records are written with a single unbuffered `write_all`, so a record is
/// visible to [`super::SegmentReader`] handles as soon as `append` returns.
pub struct SegmentWriter {
    id: SegmentId,
    file: File,
    /// Current file length = offset of the next record
    size: u64,
    sync_on_append: bool,
    /// Set when a failed append could not be rolled back
    poisoned: bool,
}

impl SegmentWriter {
    /// Create a brand-new, empty segment file
    ///
    /// Fails if a file with the same name already exists.
    pub fn create(dir: &Path, id: SegmentId, sync_on_append: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(id.path_in(dir))?;

        tracing::debug!(segment = %id, "Created segment");

        Ok(Self {
            id,
            file,
            size: 0,
            sync_on_append,
            poisoned: false,
        })
    }

    /// Append a record, returning the number of bytes written
    ///
    /// With `sync_on_append` the data reaches stable storage before return.
    /// On failure the file is cut back to the previous record boundary, so
    /// a later append never lands behind a partial record.
    pub fn append(&mut self, record: &Record) -> Result<u64> {
        if self.poisoned {
            return Err(CaskError::Storage(format!(
                "segment {} ends in a partial record that could not be removed",
                self.id
            )));
        }

        let bytes = record.encode();

        let mut outcome = self.file.write_all(&bytes);
        if outcome.is_ok() && self.sync_on_append {
            outcome = self.file.sync_data();
        }
        if let Err(e) = outcome {
            self.roll_back();
            return Err(e.into());
        }

        let written = bytes.len() as u64;
        self.size += written;
        Ok(written)
    }

    /// Cut the file back to `size`, dropping whatever a failed append left
    fn roll_back(&mut self) {
        match self.file.set_len(self.size) {
            Ok(()) => {
                tracing::warn!(segment = %self.id, size = self.size, "Rolled back failed append");
            }
            Err(e) => {
                tracing::error!(
                    segment = %self.id,
                    error = %e,
                    "Could not roll back failed append, refusing further appends"
                );
                self.poisoned = true;
            }
        }
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Whether the segment has grown past `max_size` and should be sealed
    pub fn should_rotate(&self, max_size: u64) -> bool {
        self.size > max_size
    }

    /// Offset the next record will be written at
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Seal the segment: sync and return its final size
    pub fn finish(mut self) -> Result<u64> {
        self.sync()?;
        Ok(self.size)
    }
}
