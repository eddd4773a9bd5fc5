//! Merge (compaction)
//!
//! Rewrites the live records of every sealed segment into new merge-output
//! segments and deletes the inputs.
//!
//! ## Steps
//! 1. Snapshot the sealed segments (the active segment is never an input)
//! 2. Replay each input oldest → newest; copy a record only if the keydir
//!    still points at exactly that record (segment id + value offset)
//! 3. Repoint the keydir with a compare-and-set, so a put or delete racing
//!    the merge always wins
//! 4. Sync the outputs, then delete the inputs oldest → newest
//!
//! Tombstones are never copied: every older version of their key lives in
//! an input that is deleted along with them. Deleting oldest first means an
//! interrupted merge can leave a stale value behind its tombstone, never a
//! tombstone without the value it hides.

use crate::error::{CaskError, Result};
use crate::keydir::{Keydir, KeydirEntry};
use crate::segment::{Record, SegmentKind, SegmentWriter};

use super::SegmentManager;

/// Outcome of a merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeResult {
    /// Input segments consumed and deleted
    pub segments_merged: usize,

    /// Output segments kept
    pub segments_written: usize,

    /// Live records copied forward
    pub records_copied: u64,

    /// Superseded records and tombstones dropped
    pub records_discarded: u64,

    /// Records copied but overwritten or deleted before their key could be
    /// repointed; the copies are dead weight in the outputs
    pub records_superseded: u64,

    /// Input bytes minus output bytes
    pub bytes_reclaimed: u64,
}

/// Compact every sealed segment of `storage`
///
/// The caller guarantees at most one merge runs at a time.
pub fn merge(storage: &SegmentManager, keydir: &Keydir) -> Result<MergeResult> {
    let inputs = storage.sealed_segment_ids();
    let mut result = MergeResult::default();

    if inputs.is_empty() {
        tracing::debug!("Nothing to merge");
        return Ok(result);
    }

    let mut outputs = MergeOutputs::new(storage);
    let mut input_bytes = 0u64;

    for id in &inputs {
        let reader = storage
            .reader(id)
            .ok_or_else(|| CaskError::Storage(format!("merge input {} is missing", id)))?;

        let bytes = reader.read_all()?;
        input_bytes += bytes.len() as u64;

        for scanned in reader.records(&bytes) {
            let scanned = scanned?;
            let record = &scanned.record;

            let current = match keydir.get(&record.key) {
                Some(entry) if !record.is_tombstone() => entry,
                _ => {
                    result.records_discarded += 1;
                    continue;
                }
            };

            let expected = KeydirEntry::new(
                *id,
                record.value.len() as u32,
                scanned.value_offset(),
                record.timestamp,
            );
            if !current.same_location(&expected) {
                result.records_discarded += 1;
                continue;
            }

            carry_forward(&mut outputs, keydir, &expected, record, &mut result)?;
        }
    }

    let output_bytes = outputs.finish(&mut result)?;

    for id in &inputs {
        storage.retire(id)?;
        result.segments_merged += 1;
    }

    result.bytes_reclaimed = input_bytes.saturating_sub(output_bytes);

    tracing::info!(
        segments_merged = result.segments_merged,
        segments_written = result.segments_written,
        records_copied = result.records_copied,
        records_discarded = result.records_discarded,
        records_superseded = result.records_superseded,
        bytes_reclaimed = result.bytes_reclaimed,
        "Merge complete"
    );

    Ok(result)
}

/// Copy one live record forward and repoint its key
///
/// A put or delete landing between the keydir check and the repoint wins
/// the compare-and-set.
fn carry_forward(
    outputs: &mut MergeOutputs<'_>,
    keydir: &Keydir,
    expected: &KeydirEntry,
    record: &Record,
    result: &mut MergeResult,
) -> Result<()> {
    let moved = outputs.append(record)?;
    if keydir.repoint(&record.key, expected, moved) {
        result.records_copied += 1;
    } else {
        tracing::debug!(segment = %expected.segment_id, "Key changed during merge");
        result.records_superseded += 1;
    }
    Ok(())
}

/// Output side of a merge: rotates on the same threshold as the write path
struct MergeOutputs<'a> {
    storage: &'a SegmentManager,
    current: Option<SegmentWriter>,
    sealed: Vec<SegmentWriter>,
}

impl<'a> MergeOutputs<'a> {
    fn new(storage: &'a SegmentManager) -> Self {
        Self {
            storage,
            current: None,
            sealed: Vec::new(),
        }
    }

    /// Append a live record; returns its new keydir entry
    fn append(&mut self, record: &Record) -> Result<KeydirEntry> {
        let mut writer = match self.current.take() {
            Some(writer) => writer,
            None => self.storage.create_segment(SegmentKind::Merged)?,
        };

        let offset = writer.size();
        let appended = writer.append(record);
        let entry = KeydirEntry::new(
            writer.id(),
            record.value.len() as u32,
            offset + record.value_position() as u64,
            record.timestamp,
        );

        // Only the newest output may be left with a partial record
        if appended.is_ok() && writer.should_rotate(self.storage.max_segment_size()) {
            let synced = writer.sync();
            self.sealed.push(writer);
            synced?;
        } else {
            self.current = Some(writer);
        }

        appended?;
        Ok(entry)
    }

    /// Sync every output; returns the total bytes written
    ///
    /// Outputs are created lazily, so none of them is empty.
    fn finish(self, result: &mut MergeResult) -> Result<u64> {
        let mut total = 0;

        for writer in self.sealed.into_iter().chain(self.current) {
            total += writer.finish()?;
            result.segments_written += 1;
        }

        Ok(total)
    }
}
