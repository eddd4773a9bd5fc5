//! Segment Iterator
//!
//! Sequential replay over the bytes of one segment.

use crate::error::{CaskError, Result};

use super::record::{DecodeError, Record};
use super::SegmentId;

/// A decoded record plus where it sits in its segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRecord {
    /// Byte offset of the record header
    pub offset: u64,
    pub record: Record,
}

impl ScannedRecord {
    /// Byte offset of the value field (what the keydir stores)
    pub fn value_offset(&self) -> u64 {
        self.offset + self.record.value_position() as u64
    }
}

/// Iterator over the records of a segment, oldest first
///
/// A torn trailing record ends the iteration without an error and is
/// reported through [`SegmentIterator::is_torn`]. A complete record with a
/// bad checksum yields `CorruptRecord` and ends the iteration, as does a
/// record whose length runs past a complete record further on.
pub struct SegmentIterator<'a> {
    segment: SegmentId,
    bytes: &'a [u8],
    /// Start of the next record
    offset: usize,
    torn: bool,
    failed: bool,
}

impl<'a> SegmentIterator<'a> {
    pub fn new(segment: SegmentId, bytes: &'a [u8]) -> Self {
        Self {
            segment,
            bytes,
            offset: 0,
            torn: false,
            failed: false,
        }
    }

    /// True while unread bytes remain
    pub fn has_next(&self) -> bool {
        !self.failed && !self.torn && self.offset < self.bytes.len()
    }

    /// Decode the record at the current offset and advance past it
    ///
    /// Returns `Ok(None)` at the end of the segment, including a torn tail.
    pub fn next_record(&mut self) -> Result<Option<ScannedRecord>> {
        if !self.has_next() {
            return Ok(None);
        }

        match Record::decode(&self.bytes[self.offset..]) {
            Ok(record) => {
                let scanned = ScannedRecord {
                    offset: self.offset as u64,
                    record,
                };
                self.offset += scanned.record.encoded_len();
                Ok(Some(scanned))
            }
            Err(DecodeError::Truncated { needed, available }) => {
                // A damaged length can also run past the end; a real torn
                // append is never followed by a complete record
                if let Some(next) = self.find_record_after(self.offset + 1) {
                    tracing::error!(
                        segment = %self.segment,
                        offset = self.offset,
                        needed,
                        next_record = next,
                        "Record length overruns later records"
                    );
                    self.failed = true;
                    return Err(CaskError::CorruptRecord {
                        segment: self.segment.to_string(),
                        offset: self.offset as u64,
                    });
                }
                tracing::warn!(
                    segment = %self.segment,
                    offset = self.offset,
                    needed,
                    available,
                    "Torn record at end of segment, ignoring tail"
                );
                self.torn = true;
                Ok(None)
            }
            Err(DecodeError::ChecksumMismatch { stored, computed }) => {
                tracing::error!(
                    segment = %self.segment,
                    offset = self.offset,
                    stored,
                    computed,
                    "Checksum mismatch"
                );
                self.failed = true;
                Err(CaskError::CorruptRecord {
                    segment: self.segment.to_string(),
                    offset: self.offset as u64,
                })
            }
        }
    }

    /// Start over from the first record
    pub fn rewind(&mut self) {
        self.offset = 0;
        self.torn = false;
        self.failed = false;
    }

    /// Whether the scan stopped at a partial record
    pub fn is_torn(&self) -> bool {
        self.torn
    }

    /// Length of the prefix made of complete records read so far
    pub fn valid_len(&self) -> u64 {
        self.offset as u64
    }

    /// Bytes past [`SegmentIterator::valid_len`] (non-zero only once torn)
    pub fn torn_bytes(&self) -> u64 {
        if self.torn {
            (self.bytes.len() - self.offset) as u64
        } else {
            0
        }
    }

    /// First position at or after `from` holding a complete, intact record
    fn find_record_after(&self, from: usize) -> Option<usize> {
        (from..self.bytes.len()).find(|&pos| Record::decode(&self.bytes[pos..]).is_ok())
    }
}

impl Iterator for SegmentIterator<'_> {
    type Item = Result<ScannedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
