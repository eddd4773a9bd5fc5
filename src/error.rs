//! Error types for CaskKV
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using CaskError
pub type Result<T> = std::result::Result<T, CaskError>;

/// Unified error type for CaskKV operations
#[derive(Debug, Error)]
pub enum CaskError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Open / Mode Errors
    // -------------------------------------------------------------------------
    #[error("Directory not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Database was not opened for reading")]
    NotReadable,

    #[error("Database was not opened for writing")]
    NotWritable,

    // -------------------------------------------------------------------------
    // Data Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    #[error("Value must not be empty (an empty value marks a deletion)")]
    InvalidValue,

    #[error("Corrupt record in segment {segment} at offset {offset}")]
    CorruptRecord { segment: String, offset: u64 },

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("A merge is already running on this database")]
    MergeInProgress,

    // -------------------------------------------------------------------------
    // Front-end Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl CaskError {
    /// True for errors that mean "the key is not live"
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, CaskError::KeyNotFound)
    }
}
