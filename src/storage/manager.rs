//! Segment Manager
//!
//! Owns the set of segment files in the data directory.
//!
//! ## Responsibilities
//! - Discover existing segments on startup (no manifest: directory listing)
//! - Start a fresh active segment on every writable open
//! - Append to the active segment and rotate it past the size threshold
//! - Hand out shared readers for `get`, rebuild and merge
//! - Retire segments consumed by merge

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::{Config, OpenMode};
use crate::error::{CaskError, Result};
use crate::keydir::KeydirEntry;
use crate::segment::{Record, SegmentId, SegmentKind, SegmentReader, SegmentWriter};

/// Manages the segment files of one database
///
/// ## Concurrency:
/// - `segments`: RwLock, readers clone an `Arc<SegmentReader>` and drop the lock
/// - `active`: Mutex, the single writable segment (None when read-only)
/// - `next_seq`: Atomic counter (lock-free)
/// - Sealed segments are immutable, so reads against them need no
///   coordination beyond the per-file handle lock
pub struct SegmentManager {
    /// Directory where segments are stored
    data_dir: PathBuf,

    /// Rotation threshold for active and merge-output segments
    max_segment_size: u64,

    mode: OpenMode,

    /// Every segment on disk, in replay order
    segments: RwLock<BTreeMap<SegmentId, Arc<SegmentReader>>>,

    /// Writer for the active segment
    active: Mutex<Option<SegmentWriter>>,

    /// Sequence number for the next segment id
    next_seq: AtomicU64,
}

impl SegmentManager {
    /// Open the segments in `config.data_dir`
    ///
    /// On startup:
    /// 1. Discover segment files by name (anything else is ignored)
    /// 2. Open a reader for each
    /// 3. If writable: delete empty sealed segments, create a new active segment
    pub fn open(config: &Config) -> Result<Self> {
        let data_dir = config.data_dir.clone();
        let mut segments = BTreeMap::new();
        let mut max_seq = 0;

        for entry in fs::read_dir(&data_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(SegmentId::parse_file_name) else {
                tracing::debug!(file = ?name, "Ignoring non-segment file");
                continue;
            };

            if config.mode.can_write() && entry.metadata()?.len() == 0 {
                tracing::debug!(segment = %id, "Removing empty segment");
                fs::remove_file(entry.path())?;
                continue;
            }

            max_seq = max_seq.max(id.seq());
            segments.insert(id, Arc::new(SegmentReader::open(&data_dir, id)?));
        }

        let manager = Self {
            data_dir,
            max_segment_size: config.max_segment_size,
            mode: config.mode,
            segments: RwLock::new(segments),
            active: Mutex::new(None),
            next_seq: AtomicU64::new(max_seq + 1),
        };

        if manager.is_writable() {
            let writer = manager.create_segment(SegmentKind::Data)?;
            *manager.active.lock() = Some(writer);
        }

        Ok(manager)
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    /// Append `record` to the active segment
    ///
    /// Returns where the value landed. Rotates the active segment afterwards
    /// if it grew past the threshold; a failed rotation does not fail the
    /// append (the record is already on disk) and is retried next time.
    pub fn append(&self, record: &Record) -> Result<KeydirEntry> {
        let mut active = self.active.lock();
        let writer = active.as_mut().ok_or(CaskError::NotWritable)?;

        let offset = writer.size();
        writer.append(record)?;

        let entry = KeydirEntry::new(
            writer.id(),
            record.value.len() as u32,
            offset + record.value_position() as u64,
            record.timestamp,
        );

        if writer.should_rotate(self.max_segment_size) {
            if let Err(e) = self.rotate(&mut active) {
                tracing::warn!(error = %e, "Segment rotation failed, retrying on next append");
            }
        }

        Ok(entry)
    }

    /// Replace the active segment with a fresh one and seal the old one
    fn rotate(&self, active: &mut Option<SegmentWriter>) -> Result<()> {
        let next = self.create_segment(SegmentKind::Data)?;
        if let Some(sealed) = active.replace(next) {
            let sealed_id = sealed.id();
            let size = sealed.finish()?;
            tracing::debug!(segment = %sealed_id, size, "Sealed active segment");
        }
        Ok(())
    }

    /// Create and register a new empty segment
    ///
    /// The reader is registered before returning so records become
    /// readable as soon as they are appended.
    pub fn create_segment(&self, kind: SegmentKind) -> Result<SegmentWriter> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let id = SegmentId::new(kind, seq);

        let writer = SegmentWriter::create(&self.data_dir, id, self.mode.sync_on_put())?;
        let reader = SegmentReader::open(&self.data_dir, id)?;
        self.segments.write().insert(id, Arc::new(reader));

        Ok(writer)
    }

    /// Delete a segment, returning its size in bytes
    ///
    /// Readers already handed out keep working on platforms that allow
    /// reading unlinked files; new lookups no longer see the segment.
    pub fn retire(&self, id: &SegmentId) -> Result<u64> {
        let reader = self.segments.write().remove(id).ok_or_else(|| {
            CaskError::Storage(format!("cannot retire unknown segment {}", id))
        })?;

        let size = reader.len()?;
        fs::remove_file(reader.path())?;
        tracing::debug!(segment = %id, size, "Retired segment");

        Ok(size)
    }

    /// Cut a segment back to `len` bytes (drops a torn tail)
    pub fn truncate(&self, id: &SegmentId, len: u64) -> Result<()> {
        let file = OpenOptions::new().write(true).open(id.path_in(&self.data_dir))?;
        file.set_len(len)?;
        file.sync_all()?;

        tracing::warn!(segment = %id, len, "Truncated torn segment tail");
        Ok(())
    }

    /// Force the active segment to disk
    pub fn sync(&self) -> Result<()> {
        if let Some(writer) = self.active.lock().as_mut() {
            writer.sync()?;
        }
        Ok(())
    }

    // =========================================================================
    // Read Path
    // =========================================================================

    /// Shared reader for `id`, if the segment still exists
    pub fn reader(&self, id: &SegmentId) -> Option<Arc<SegmentReader>> {
        self.segments.read().get(id).cloned()
    }

    /// Read and verify the value `entry` points at
    ///
    /// `Ok(None)` when the segment was retired since `entry` was looked up.
    pub fn read_value(&self, key: &[u8], entry: &KeydirEntry) -> Result<Option<Vec<u8>>> {
        match self.reader(&entry.segment_id) {
            Some(reader) => reader
                .read_value(key, entry.value_offset, entry.value_size)
                .map(Some),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// All segment ids in replay order (oldest first)
    pub fn segment_ids(&self) -> Vec<SegmentId> {
        self.segments.read().keys().copied().collect()
    }

    /// Every segment except the active one, in replay order
    pub fn sealed_segment_ids(&self) -> Vec<SegmentId> {
        // Hold the active lock so a concurrent rotation cannot slip the new
        // active segment into the result
        let active = self.active.lock();
        let active_id = active.as_ref().map(|w| w.id());

        self.segments
            .read()
            .keys()
            .copied()
            .filter(|id| Some(*id) != active_id)
            .collect()
    }

    pub fn active_segment_id(&self) -> Option<SegmentId> {
        self.active.lock().as_ref().map(|w| w.id())
    }

    /// Current size of the active segment
    pub fn active_segment_size(&self) -> Option<u64> {
        self.active.lock().as_ref().map(|w| w.size())
    }

    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    /// Sum of all segment sizes in bytes
    pub fn total_size(&self) -> Result<u64> {
        let readers: Vec<_> = self.segments.read().values().cloned().collect();
        readers
            .iter()
            .try_fold(0u64, |acc, r| -> Result<u64> { Ok(acc + r.len()?) })
    }

    pub fn is_writable(&self) -> bool {
        self.mode.can_write()
    }

    pub fn max_segment_size(&self) -> u64 {
        self.max_segment_size
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
