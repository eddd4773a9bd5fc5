//! Keydir Rebuild
//!
//! Crash recovery: replays every segment to reconstruct the keydir.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{CaskError, Result};
use crate::segment::{ScannedRecord, SegmentId, SegmentKind, SegmentReader};
use crate::storage::SegmentManager;

use super::{Keydir, KeydirEntry};

/// Rebuilds the keydir from the segments on disk
pub struct KeydirRebuild;

/// Result of a rebuild
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildResult {
    /// Number of segments replayed
    pub segments_scanned: usize,

    /// Number of complete records replayed (puts and tombstones)
    pub records_replayed: u64,

    /// Keys live after tombstones were purged
    pub live_keys: usize,

    /// Segments that ended in a partial record
    pub torn_segments: usize,

    /// Bytes of partial records cut off (writable opens only)
    pub bytes_truncated: u64,
}

impl KeydirRebuild {
    /// Replay every segment oldest → newest and return the live keydir
    ///
    /// This will:
    /// 1. Decode each record, keeping the newest one per key
    ///    (ties go to the later record in replay order)
    /// 2. Accept a torn tail only in the newest non-empty segment of each
    ///    kind, truncating it if the database is writable
    /// 3. Abort with `CorruptRecord` on a torn record anywhere else, and on
    ///    the first complete record with a bad checksum
    /// 4. Drop every key whose newest record is a tombstone
    pub fn rebuild(storage: &SegmentManager) -> Result<(Keydir, RebuildResult)> {
        let mut latest: HashMap<Vec<u8>, KeydirEntry> = HashMap::new();
        let mut result = RebuildResult::default();

        let ids = storage.segment_ids();
        let tails = Self::tail_segments(storage, &ids)?;

        for id in ids {
            let reader = Self::reader(storage, &id)?;
            let bytes = reader.read_all()?;
            let mut records = reader.records(&bytes);

            while let Some(scanned) = records.next_record()? {
                Self::apply(&mut latest, id, scanned);
                result.records_replayed += 1;
            }

            if records.is_torn() {
                if !tails.contains(&id) {
                    tracing::error!(
                        segment = %id,
                        offset = records.valid_len(),
                        "Partial record in a segment that was not being appended to"
                    );
                    return Err(CaskError::CorruptRecord {
                        segment: id.to_string(),
                        offset: records.valid_len(),
                    });
                }

                result.torn_segments += 1;
                if storage.is_writable() {
                    storage.truncate(&id, records.valid_len())?;
                    result.bytes_truncated += records.torn_bytes();
                }
            }

            result.segments_scanned += 1;
        }

        latest.retain(|_, entry| !entry.is_tombstone());
        result.live_keys = latest.len();

        Ok((Keydir::from_map(latest), result))
    }

    /// Segments that may legitimately end mid-record after a crash
    ///
    /// Only the newest non-empty data segment (the active one of the last
    /// session) and the newest non-empty merge output (an interrupted merge)
    /// were open for appends. Empty segments are skipped since a writable
    /// open has already created a fresh active segment.
    fn tail_segments(storage: &SegmentManager, ids: &[SegmentId]) -> Result<Vec<SegmentId>> {
        let mut tails = Vec::with_capacity(2);
        for kind in [SegmentKind::Data, SegmentKind::Merged] {
            for id in ids.iter().rev().filter(|id| id.kind() == kind) {
                if !Self::reader(storage, id)?.is_empty()? {
                    tails.push(*id);
                    break;
                }
            }
        }
        Ok(tails)
    }

    fn reader(storage: &SegmentManager, id: &SegmentId) -> Result<Arc<SegmentReader>> {
        storage.reader(id).ok_or_else(|| {
            CaskError::Storage(format!("segment {} disappeared during rebuild", id))
        })
    }

    /// Upsert `scanned` unless a strictly newer record is already known
    fn apply(latest: &mut HashMap<Vec<u8>, KeydirEntry>, id: SegmentId, scanned: ScannedRecord) {
        let entry = KeydirEntry::new(
            id,
            scanned.record.value.len() as u32,
            scanned.value_offset(),
            scanned.record.timestamp,
        );

        latest
            .entry(scanned.record.key)
            .and_modify(|current| {
                if entry.timestamp >= current.timestamp {
                    *current = entry;
                }
            })
            .or_insert(entry);
    }
}
