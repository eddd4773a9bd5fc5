//! Segment Module
//!
//! Append-only data files ("segments") and the record format stored in them.
//!
//! ## Responsibilities
//! - Encode/decode records with a CRC32 over every field but the checksum
//! - Append records to the single active segment
//! - Replay a segment sequentially, dropping a torn trailing record
//! - Random-access reads of a single record for `get`
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Record 1                                                     │
//! │ ┌─────────┬─────────┬──────────┬──────────┬───────┬────────┐ │
//! │ │ CRC (4) │ TS (4)  │ KeyLen(4)│ ValLen(4)│  Key  │ Value  │ │
//! │ └─────────┴─────────┴──────────┴──────────┴───────┴────────┘ │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Record 2 ...                                                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian. `ValLen == 0` marks a tombstone.
//!
//! ## File Naming
//! `{seq:08}-{token}.seg` for segments written by `put`/`delete`,
//! `{seq:08}-{token}.merge` for merge outputs. The token is a random
//! UUID so ids never collide across restarts; the sequence fixes the
//! replay order.

mod iterator;
mod reader;
mod record;
mod writer;

use std::fmt;
use std::path::{Path, PathBuf};

use uuid::Uuid;

pub use iterator::{ScannedRecord, SegmentIterator};
pub use reader::SegmentReader;
pub use record::{now_timestamp, DecodeError, Record, RecordHeader, HEADER_SIZE};
pub use writer::SegmentWriter;

/// File extension for segments produced by the write path
pub(crate) const DATA_EXTENSION: &str = "seg";

/// File extension for segments produced by merge
pub(crate) const MERGE_EXTENSION: &str = "merge";

// =============================================================================
// Segment Identity
// =============================================================================

/// Where a segment came from
///
/// The derived ordering puts merge outputs before write-path segments:
/// a merge output only holds records that were live when it was written,
/// so every write-path segment that outlived the merge is logically newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SegmentKind {
    Merged,
    Data,
}

impl SegmentKind {
    fn extension(self) -> &'static str {
        match self {
            SegmentKind::Merged => MERGE_EXTENSION,
            SegmentKind::Data => DATA_EXTENSION,
        }
    }
}

/// Unique, ordered identifier of one segment file
///
/// `Ord` is the replay order used by recovery and merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId {
    kind: SegmentKind,
    seq: u64,
    token: Uuid,
}

impl SegmentId {
    /// New id with a fresh random token
    pub fn new(kind: SegmentKind, seq: u64) -> Self {
        Self {
            kind,
            seq,
            token: Uuid::new_v4(),
        }
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// File name inside the data directory
    pub fn file_name(&self) -> String {
        format!(
            "{:08}-{}.{}",
            self.seq,
            self.token.simple(),
            self.kind.extension()
        )
    }

    /// Full path of the segment file inside `dir`
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }

    /// Parse a segment file name
    /// "00000042-<32 hex>.seg" → Some(SegmentId { Data, 42, .. })
    pub fn parse_file_name(name: &str) -> Option<Self> {
        let (stem, ext) = name.rsplit_once('.')?;
        let kind = match ext {
            DATA_EXTENSION => SegmentKind::Data,
            MERGE_EXTENSION => SegmentKind::Merged,
            _ => return None,
        };

        let (seq_str, token_str) = stem.split_once('-')?;
        let seq = seq_str.parse().ok()?;
        let token = Uuid::try_parse(token_str).ok()?;

        Some(Self { kind, seq, token })
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}
