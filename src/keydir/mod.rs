//! Keydir Module
//!
//! In-memory index from every live key to the location of its newest value.
//!
//! ## Responsibilities
//! - O(1) lookups for `get`
//! - Rebuilt from the segments on every open, never persisted
//! - Repointed by merge when a live record moves to a new segment
//!
//! ## Data Structure Choice
//! `HashMap` behind a `parking_lot::RwLock`: point lookups only, no range
//! scans, many concurrent readers.

mod rebuild;
mod table;

pub use rebuild::{KeydirRebuild, RebuildResult};
pub use table::Keydir;

use crate::segment::SegmentId;

/// Location of the newest value for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeydirEntry {
    /// Segment holding the record
    pub segment_id: SegmentId,

    /// Length of the value (0 only transiently, for tombstones during rebuild)
    pub value_size: u32,

    /// Byte offset of the value field inside the segment
    pub value_offset: u64,

    /// Record timestamp (seconds)
    pub timestamp: u32,
}

impl KeydirEntry {
    pub fn new(segment_id: SegmentId, value_size: u32, value_offset: u64, timestamp: u32) -> Self {
        Self {
            segment_id,
            value_size,
            value_offset,
            timestamp,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.value_size == 0
    }

    /// Same record identity: same segment and same value offset
    pub fn same_location(&self, other: &KeydirEntry) -> bool {
        self.segment_id == other.segment_id && self.value_offset == other.value_offset
    }

    /// End of the value field; never past the owning segment's length
    pub fn value_end(&self) -> u64 {
        self.value_offset + self.value_size as u64
    }
}
