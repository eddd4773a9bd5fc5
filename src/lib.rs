//! # CaskKV
//!
//! An embeddable, log-structured key-value store following the Bitcask model:
//! - Append-only segment files with CRC32-checked records
//! - In-memory keydir: one lookup and one disk read per `get`
//! - Crash recovery by replaying every segment
//! - Merge (compaction) to reclaim superseded versions and tombstones
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                             │
//! │      open / put / get / delete / merge  (single writer)     │
//! └───────────────┬─────────────────────────────┬───────────────┘
//!                 │                             │
//!                 ▼                             ▼
//!          ┌─────────────┐              ┌──────────────┐
//!          │   Keydir    │              │   Segments   │
//!          │  (RwLock)   │─── points ──▶│ active + N   │
//!          └─────────────┘    into      │   sealed     │
//!                                       └──────┬───────┘
//!                                              │
//!                                              ▼
//!                                       ┌──────────────┐
//!                                       │    Merge     │
//!                                       │ (compaction) │
//!                                       └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use caskkv::{Engine, OpenMode};
//!
//! let db = Engine::open_path("db", OpenMode::READ | OpenMode::WRITE | OpenMode::CREATE)?;
//! db.put(b"a", b"1")?;
//! assert_eq!(db.get(b"a")?, b"1");
//! db.delete(b"a")?;
//! assert!(db.get(b"a").unwrap_err().is_key_not_found());
//! # Ok::<(), caskkv::CaskError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod segment;
pub mod keydir;
pub mod storage;
pub mod protocol;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CaskError, Result};
pub use config::{Config, OpenMode};
pub use engine::Engine;
pub use storage::MergeResult;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of CaskKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
