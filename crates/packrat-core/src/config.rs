//! Configuration for archive builds.

use crate::ArchiveError;
use crate::Result;

/// Default size of the buffer used to stream file content.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// How zip entries store file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZipCompression {
    /// Content stored verbatim (method 0).
    #[default]
    Stored,
    /// Raw deflate (method 8) at the given level, 1 (fastest) to 9 (best).
    Deflate {
        /// Compression level.
        level: u32,
    },
}

/// Configuration for archive builds.
///
/// Every option keeps output deterministic: the same configuration over the
/// same filesystem state always yields the same bytes.
///
/// # Examples
///
/// ```
/// use packrat_core::BuildConfig;
/// use packrat_core::config::ZipCompression;
///
/// let config = BuildConfig::default()
///     .with_exclude_patterns(vec!["*.tmp".into(), ".git".into()])
///     .with_preserve_permissions(false)
///     .with_zip_compression(ZipCompression::Deflate { level: 9 });
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Patterns matched against each child name during directory expansion.
    ///
    /// Supports exact names, `*suffix` and `prefix*`. Roots are never
    /// excluded.
    ///
    /// Default: empty.
    pub exclude_patterns: Vec<String>,

    /// Record the permission bits reported by the filesystem.
    ///
    /// When `false`, every entry gets the per-kind default (0o644 files,
    /// 0o755 directories, 0o777 symlinks).
    ///
    /// Default: `true`.
    pub preserve_permissions: bool,

    /// Replaces every entry's modification time.
    ///
    /// Default: `None` (use filesystem times).
    pub mtime_override: Option<u64>,

    /// Content encoding for zip entries.
    ///
    /// Default: [`ZipCompression::Stored`].
    pub zip_compression: ZipCompression,

    /// Gzip level for `tar.gz` output (1-9).
    ///
    /// Default: 6.
    pub gzip_level: u32,

    /// Size of the buffer used to stream file content.
    ///
    /// Default: 64 KiB.
    pub chunk_size: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: Vec::new(),
            preserve_permissions: true,
            mtime_override: None,
            zip_compression: ZipCompression::Stored,
            gzip_level: 6,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl BuildConfig {
    /// Creates a new `BuildConfig` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the exclude patterns.
    #[must_use]
    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Sets whether to record filesystem permission bits.
    #[must_use]
    pub fn with_preserve_permissions(mut self, preserve: bool) -> Self {
        self.preserve_permissions = preserve;
        self
    }

    /// Sets a fixed modification time for every entry.
    #[must_use]
    pub fn with_mtime_override(mut self, mtime: Option<u64>) -> Self {
        self.mtime_override = mtime;
        self
    }

    /// Sets the zip content encoding.
    #[must_use]
    pub fn with_zip_compression(mut self, compression: ZipCompression) -> Self {
        self.zip_compression = compression;
        self
    }

    /// Sets the gzip level used for `tar.gz`.
    #[must_use]
    pub fn with_gzip_level(mut self, level: u32) -> Self {
        self.gzip_level = level;
        self
    }

    /// Sets the streaming chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Validation`] if:
    /// - a compression level is outside 1-9
    /// - the chunk size is zero
    /// - an exclude pattern is empty
    pub fn validate(&self) -> Result<()> {
        if !(1..=9).contains(&self.gzip_level) {
            return Err(ArchiveError::validation(format!(
                "gzip level must be 1-9, got {}",
                self.gzip_level
            )));
        }
        if let ZipCompression::Deflate { level } = self.zip_compression
            && !(1..=9).contains(&level)
        {
            return Err(ArchiveError::validation(format!(
                "deflate level must be 1-9, got {level}"
            )));
        }
        if self.chunk_size == 0 {
            return Err(ArchiveError::validation("chunk size must be positive"));
        }
        if self.exclude_patterns.iter().any(String::is_empty) {
            return Err(ArchiveError::validation("exclude patterns must not be empty"));
        }
        Ok(())
    }
}
