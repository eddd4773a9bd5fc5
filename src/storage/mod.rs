//! Storage Module
//!
//! The set of segment files that make up one database, and compaction.
//!
//! ## Responsibilities
//! - Discover segments on startup by listing the data directory
//! - Keep exactly one writable (active) segment; all others are read-only
//! - Rotate the active segment when it exceeds the size threshold
//! - Merge sealed segments into fewer, denser ones
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── 00000003-<token>.merge   merge output (replayed first)
//!   ├── 00000004-<token>.seg     sealed
//!   └── 00000005-<token>.seg     active
//! ```
//! There is no manifest and no lock file: one writer per directory is
//! assumed, not enforced.

mod manager;
mod merge;

pub use manager::SegmentManager;
pub use merge::{merge, MergeResult};
