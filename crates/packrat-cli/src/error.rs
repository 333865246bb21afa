//! Error conversion utilities for CLI.
//!
//! Converts packrat-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use packrat_core::ArchiveError;
use std::path::Path;

/// Converts `ArchiveError` to user-friendly anyhow error with context
pub fn convert_archive_error(err: ArchiveError, output: &Path) -> anyhow::Error {
    match err {
        ArchiveError::Validation { reason } => {
            anyhow!(
                "Cannot create '{}': {}\n\
                 HINT: Supported formats: tar, tar.gz (tgz), zip. Use --format to override detection.",
                output.display(),
                reason
            )
        }
        ArchiveError::EntryResolution { path, source } => {
            anyhow!(
                "Cannot read source '{}': {}\n\
                 HINT: Check that the path exists and is readable. Nothing was written to '{}'.",
                path.display(),
                source,
                output.display()
            )
        }
        ArchiveError::DuplicateEntry {
            name,
            first,
            second,
        } => {
            anyhow!(
                "Two sources map to the same archive entry '{}': '{}' and '{}'\n\
                 HINT: Rename one of the sources or archive their parent directory instead.",
                name,
                first.display(),
                second.display()
            )
        }
        ArchiveError::SizeMismatch {
            path,
            expected,
            actual,
        } => {
            anyhow!(
                "Source '{}' changed while archiving (expected {} bytes, read {})\n\
                 HINT: '{}' is incomplete. Re-run once the source is no longer being written.",
                path.display(),
                expected,
                actual,
                output.display()
            )
        }
        ArchiveError::Cancelled => {
            anyhow!(
                "Archive creation of '{}' was cancelled\n\
                 HINT: Increase --timeout if the sources are large.",
                output.display()
            )
        }
        err @ ArchiveError::Write { .. } => anyhow::Error::from(err).context(format!(
            "Error writing archive '{}' (the file may be incomplete)",
            output.display()
        )),
    }
}
