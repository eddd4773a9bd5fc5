//! Configuration for CaskKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use bitflags::bitflags;

/// Default rotation threshold for the active segment (in bytes)
pub const DEFAULT_MAX_SEGMENT_SIZE: u64 = 200_000;

bitflags! {
    /// Permissions requested when opening a database
    ///
    /// Combine with `|`, e.g. `OpenMode::READ | OpenMode::WRITE | OpenMode::CREATE`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenMode: u8 {
        /// Allow `get`
        const READ = 1 << 0;
        /// Allow `put`, `delete` and `merge`
        const WRITE = 1 << 1;
        /// Create the directory if it is missing
        const CREATE = 1 << 2;
        /// fsync the active segment before every write returns
        const SYNC_ON_PUT = 1 << 3;
    }
}

impl OpenMode {
    pub fn can_read(self) -> bool {
        self.contains(OpenMode::READ)
    }

    pub fn can_write(self) -> bool {
        self.contains(OpenMode::WRITE)
    }

    pub fn can_create(self) -> bool {
        self.contains(OpenMode::CREATE)
    }

    pub fn sync_on_put(self) -> bool {
        self.contains(OpenMode::SYNC_ON_PUT)
    }
}

impl Default for OpenMode {
    /// Read-only, like opening without any options
    fn default() -> Self {
        OpenMode::READ
    }
}

/// Main configuration for a CaskKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding every segment file
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── 00000001-<token>.seg     (write-path segments)
    ///     └── 00000007-<token>.merge   (merge outputs)
    pub data_dir: PathBuf,

    /// Permissions for this instance
    pub mode: OpenMode,

    // -------------------------------------------------------------------------
    // Segment Configuration
    // -------------------------------------------------------------------------
    /// Rotate the active segment once it grows past this many bytes.
    /// Merge outputs rotate on the same threshold.
    pub max_segment_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./caskkv_data"),
            mode: OpenMode::default(),
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the open mode
    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the segment rotation threshold (in bytes)
    pub fn max_segment_size(mut self, size: u64) -> Self {
        self.config.max_segment_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
