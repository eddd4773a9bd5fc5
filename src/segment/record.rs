//! Segment Record
//!
//! Fixed 16-byte header followed by the key and value bytes.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Header size: CRC (4) + Timestamp (4) + KeyLen (4) + ValLen (4) = 16 bytes
pub const HEADER_SIZE: usize = 16;

/// Offset of the first checksummed byte (everything after the CRC)
const CHECKSUMMED_FROM: usize = 4;

/// Why a record could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer ends before the record does (torn write)
    #[error("truncated record: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    /// The record is complete but its checksum does not match
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
}

/// Seconds since the Unix epoch, truncated to 32 bits
pub fn now_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

// =============================================================================
// Header
// =============================================================================

/// The fixed-size part of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub checksum: u32,
    pub timestamp: u32,
    pub key_size: u32,
    pub value_size: u32,
}

impl RecordHeader {
    /// Parse the header from the front of `bytes`
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < HEADER_SIZE {
            return Err(DecodeError::Truncated {
                needed: HEADER_SIZE,
                available: bytes.len(),
            });
        }

        let mut buf = &bytes[..HEADER_SIZE];
        Ok(Self {
            checksum: buf.get_u32_le(),
            timestamp: buf.get_u32_le(),
            key_size: buf.get_u32_le(),
            value_size: buf.get_u32_le(),
        })
    }

    /// Total encoded size of the record this header starts
    pub fn record_len(&self) -> usize {
        HEADER_SIZE + self.key_size as usize + self.value_size as usize
    }
}

// =============================================================================
// Record
// =============================================================================

/// One log record: a put, or a tombstone when the value is empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub timestamp: u32,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Record {
    pub fn new(key: Vec<u8>, value: Vec<u8>, timestamp: u32) -> Self {
        Self {
            timestamp,
            key,
            value,
        }
    }

    /// A deletion marker for `key`
    pub fn tombstone(key: Vec<u8>, timestamp: u32) -> Self {
        Self::new(key, Vec::new(), timestamp)
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_empty()
    }

    /// Bytes this record occupies on disk
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.key.len() + self.value.len()
    }

    /// Distance from the start of the record to its value field
    pub fn value_position(&self) -> usize {
        HEADER_SIZE + self.key.len()
    }

    /// CRC32 (IEEE) over timestamp, sizes, key and value
    pub fn checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.timestamp.to_le_bytes());
        hasher.update(&(self.key.len() as u32).to_le_bytes());
        hasher.update(&(self.value.len() as u32).to_le_bytes());
        hasher.update(&self.key);
        hasher.update(&self.value);
        hasher.finalize()
    }

    /// Serialize to the on-disk layout
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u32_le(0); // checksum, filled in below
        buf.put_u32_le(self.timestamp);
        buf.put_u32_le(self.key.len() as u32);
        buf.put_u32_le(self.value.len() as u32);
        buf.put_slice(&self.key);
        buf.put_slice(&self.value);

        let checksum = crc32fast::hash(&buf[CHECKSUMMED_FROM..]);
        buf[..CHECKSUMMED_FROM].copy_from_slice(&checksum.to_le_bytes());

        buf.freeze()
    }

    /// Decode the record at the front of `bytes`
    ///
    /// Trailing bytes after the record are ignored; use
    /// [`Record::encoded_len`] to advance.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let header = RecordHeader::parse(bytes)?;

        let record_len = header.record_len();
        if bytes.len() < record_len {
            return Err(DecodeError::Truncated {
                needed: record_len,
                available: bytes.len(),
            });
        }

        let computed = crc32fast::hash(&bytes[CHECKSUMMED_FROM..record_len]);
        if computed != header.checksum {
            return Err(DecodeError::ChecksumMismatch {
                stored: header.checksum,
                computed,
            });
        }

        let key_end = HEADER_SIZE + header.key_size as usize;
        Ok(Self {
            timestamp: header.timestamp,
            key: bytes[HEADER_SIZE..key_end].to_vec(),
            value: bytes[key_end..record_len].to_vec(),
        })
    }
}
