//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Validate the directory and open mode
//! - Rebuild the keydir from the segments (crash recovery)
//! - Serve put/get/delete against the active segment and the keydir
//! - Run merges without blocking the write path

use std::fs;
use std::path::Path;

use parking_lot::Mutex;

use crate::config::{Config, OpenMode};
use crate::error::{CaskError, Result};
use crate::keydir::{Keydir, KeydirRebuild, RebuildResult};
use crate::protocol::Command;
use crate::segment::{now_timestamp, Record, SegmentId};
use crate::storage::{self, MergeResult, SegmentManager};

/// How many times `get` follows a keydir entry whose segment was retired
/// by a concurrent merge before giving up
const MAX_READ_ATTEMPTS: usize = 4;

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (put/delete): Serialized by `write_lock`
///   - Only ONE write operation at a time
///   - Must acquire: write_lock → active segment → keydir (write)
///   - The keydir is updated only after the record is appended, so a
///     rebuild after a crash always agrees with what callers observed
///
/// - **Reads** (get): No write_lock needed
///   - Keydir uses an internal RwLock (many concurrent readers)
///   - Segment readers are shared `Arc`s; sealed segments never change
///
/// - **Merge**: Serialized by `merge_lock`, runs alongside reads and writes
///   - Reads sealed segments only; the active segment is never an input
///   - Repoints keydir entries with compare-and-set
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Live key → newest value location
    keydir: Keydir,

    /// Segment files (active writer + shared readers)
    storage: SegmentManager,

    /// Serializes write operations (put/delete)
    write_lock: Mutex<()>,

    /// At most one merge in flight
    merge_lock: Mutex<()>,

    /// Statistics from the rebuild run at open
    recovery: RebuildResult,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Check the directory (create it if CREATE was requested)
    /// 2. Discover segments; start a fresh active segment if writable
    /// 3. Rebuild the keydir by replaying every segment
    /// 4. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        let mode = config.mode;

        // Step 1: Validate the data directory
        if !config.data_dir.exists() {
            if !mode.can_create() {
                return Err(CaskError::NotFound(config.data_dir.clone()));
            }
            fs::create_dir_all(&config.data_dir)?;
        } else if !config.data_dir.is_dir() {
            return Err(CaskError::Storage(format!(
                "{} is not a directory",
                config.data_dir.display()
            )));
        }

        // Step 2: Open segments
        let storage = SegmentManager::open(&config)?;

        // Step 3: Rebuild keydir (aborts on any corrupt record)
        let (keydir, recovery) = KeydirRebuild::rebuild(&storage)?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            mode = ?mode,
            segments = recovery.segments_scanned,
            records = recovery.records_replayed,
            live_keys = recovery.live_keys,
            torn_segments = recovery.torn_segments,
            "Opened database"
        );

        Ok(Self {
            config,
            keydir,
            storage,
            write_lock: Mutex::new(()),
            merge_lock: Mutex::new(()),
            recovery,
        })
    }

    /// Open with a path and mode (convenience method)
    ///
    /// Uses the default config otherwise
    pub fn open_path(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let config = Config::builder()
            .data_dir(path.as_ref())
            .mode(mode)
            .build();
        Self::open(config)
    }

    /// Execute a front-end command
    ///
    /// Routes commands to appropriate handlers; only `Get` yields a value
    pub fn execute(&self, command: Command) -> Result<Option<Vec<u8>>> {
        match command {
            Command::Get { key } => self.get(&key).map(Some),
            Command::Put { key, value } => {
                self.put(&key, &value)?;
                Ok(None)
            }
            Command::Delete { key } => {
                self.delete(&key)?;
                Ok(None)
            }
            Command::Merge => {
                self.merge()?;
                Ok(None)
            }
            Command::Quit => Ok(None),
        }
    }

    /// Get the value for a key
    ///
    /// One keydir lookup, then one random read of the record, whose
    /// checksum and key are verified before the value is returned.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        if !self.config.mode.can_read() {
            return Err(CaskError::NotReadable);
        }

        for _ in 0..MAX_READ_ATTEMPTS {
            let entry = self.keydir.get(key).ok_or(CaskError::KeyNotFound)?;

            // None: a merge retired the segment after our lookup and has
            // already repointed the key, so look it up again
            if let Some(value) = self.storage.read_value(key, &entry)? {
                return Ok(value);
            }
        }

        Err(CaskError::Storage(format!(
            "segment for key kept disappearing after {} attempts",
            MAX_READ_ATTEMPTS
        )))
    }

    /// Put a key-value pair
    ///
    /// Steps:
    /// 1. Reject empty values (an empty value is a tombstone on disk)
    /// 2. Acquire write lock
    /// 3. Append to the active segment (rotating it if needed)
    /// 4. Point the keydir at the new record
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if !self.config.mode.can_write() {
            return Err(CaskError::NotWritable);
        }
        if value.is_empty() {
            return Err(CaskError::InvalidValue);
        }

        // Stamp under the lock so append order never runs backwards in time
        let _write_guard = self.write_lock.lock();
        let record = Record::new(key.to_vec(), value.to_vec(), now_timestamp());
        let entry = self.storage.append(&record)?;
        self.keydir.set(record.key, entry);

        Ok(())
    }

    /// Delete a key
    ///
    /// Steps:
    /// 1. Acquire write lock
    /// 2. Fail if the key is not live (nothing is written)
    /// 3. Append a tombstone
    /// 4. Remove the keydir entry
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        if !self.config.mode.can_write() {
            return Err(CaskError::NotWritable);
        }

        let _write_guard = self.write_lock.lock();

        if !self.keydir.contains_key(key) {
            return Err(CaskError::KeyNotFound);
        }

        let tombstone = Record::tombstone(key.to_vec(), now_timestamp());
        self.storage.append(&tombstone)?;
        self.keydir.delete(key);

        Ok(())
    }

    /// Compact every sealed segment
    ///
    /// Visible state is unchanged; superseded records and tombstones are
    /// dropped. Fails with `MergeInProgress` if another merge is running.
    pub fn merge(&self) -> Result<MergeResult> {
        if !self.config.mode.can_write() {
            return Err(CaskError::NotWritable);
        }

        let _merge_guard = self.merge_lock.try_lock().ok_or(CaskError::MergeInProgress)?;
        storage::merge(&self.storage, &self.keydir)
    }

    /// Force the active segment to disk
    pub fn sync(&self) -> Result<()> {
        self.storage.sync()
    }

    /// Close the engine gracefully
    ///
    /// Syncs the active segment. Dropping the engine without calling this
    /// is safe; writes that were not synced may be lost on power failure.
    pub fn close(self) -> Result<()> {
        self.sync()?;
        tracing::info!(data_dir = %self.config.data_dir.display(), "Closed database");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Whether `key` is currently live
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.keydir.contains_key(key)
    }

    /// All live keys, sorted
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.keydir.keys()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.keydir.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keydir.is_empty()
    }

    /// Number of segment files, active included
    pub fn segment_count(&self) -> usize {
        self.storage.segment_count()
    }

    /// Id of the active segment (None when read-only)
    pub fn active_segment(&self) -> Option<SegmentId> {
        self.storage.active_segment_id()
    }

    /// Segment ids in replay order
    pub fn segments(&self) -> Vec<SegmentId> {
        self.storage.segment_ids()
    }

    /// Total bytes across all segments
    pub fn disk_size(&self) -> Result<u64> {
        self.storage.total_size()
    }

    /// Statistics from the rebuild performed at open
    pub fn recovery(&self) -> &RebuildResult {
        &self.recovery
    }

    /// The keydir (read-only view for diagnostics)
    pub fn keydir(&self) -> &Keydir {
        &self.keydir
    }

    pub fn mode(&self) -> OpenMode {
        self.config.mode
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
