//! Error types for archive construction.

use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ArchiveError`.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Errors that can occur while building an archive.
///
/// Every variant aborts the whole build; there is no partial-success mode.
/// The first three variants are raised before any destination bytes are
/// written (see [`ArchiveError::is_pre_write`]).
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Job parameters are unusable (empty root list, bad configuration,
    /// unsupported format, unwritable destination).
    #[error("invalid archive job: {reason}")]
    Validation {
        /// Why the job was rejected.
        reason: String,
    },

    /// A root or one of its descendants could not be stat'ed, listed or read.
    #[error("cannot resolve {path}: {source}")]
    EntryResolution {
        /// The path that failed to resolve.
        path: PathBuf,
        /// Underlying cause (not found, permission denied, ...).
        #[source]
        source: std::io::Error,
    },

    /// Two distinct sources map to the same archive-relative name.
    #[error("duplicate archive entry '{name}': {first} and {second}")]
    DuplicateEntry {
        /// The colliding archive name.
        name: String,
        /// Source path of the entry that claimed the name first.
        first: PathBuf,
        /// Source path of the entry that collided.
        second: PathBuf,
    },

    /// A file changed size between resolution and writing.
    #[error("size of {path} changed during archiving: expected {expected} bytes, found {actual}")]
    SizeMismatch {
        /// The file whose size changed.
        path: PathBuf,
        /// Size recorded at resolution time (and written into the header).
        expected: u64,
        /// Number of bytes the file actually produced.
        actual: u64,
    },

    /// Reading a source file or writing the destination failed.
    #[error("write failed ({context}): {source}")]
    Write {
        /// What was being written when the failure occurred.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The build was cancelled at an entry boundary.
    #[error("archive build cancelled")]
    Cancelled,
}

impl ArchiveError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub(crate) fn resolution(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::EntryResolution {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Write {
            context: context.into(),
            source,
        }
    }

    /// Returns `true` if the error was raised before any destination bytes
    /// were written.
    ///
    /// # Examples
    ///
    /// ```
    /// use packrat_core::ArchiveError;
    ///
    /// let err = ArchiveError::Validation {
    ///     reason: "no roots".into(),
    /// };
    /// assert!(err.is_pre_write());
    /// assert!(!ArchiveError::Cancelled.is_pre_write());
    /// ```
    #[must_use]
    pub const fn is_pre_write(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::EntryResolution { .. } | Self::DuplicateEntry { .. }
        )
    }

    /// Returns the source path this error refers to, if any.
    ///
    /// For duplicates this is the second (colliding) source.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::EntryResolution { path, .. } | Self::SizeMismatch { path, .. } => Some(path),
            Self::DuplicateEntry { second, .. } => Some(second),
            _ => None,
        }
    }
}
