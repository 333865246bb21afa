//! Build operation reporting.

use std::time::Duration;

use crate::types::ArchiveFormat;

/// Report of a finished build.
///
/// # Examples
///
/// ```
/// use packrat_core::BuildReport;
/// use packrat_core::types::ArchiveFormat;
///
/// let mut report = BuildReport::new(ArchiveFormat::Tar);
/// report.files_added = 2;
/// report.directories_added = 1;
/// assert_eq!(report.total_entries(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Container format that was written.
    pub format: ArchiveFormat,

    /// Number of regular files written.
    pub files_added: usize,

    /// Number of directories written.
    pub directories_added: usize,

    /// Number of symlinks written.
    pub symlinks_added: usize,

    /// File content bytes streamed from sources (before any compression).
    pub content_bytes: u64,

    /// Container bytes delivered to the sink.
    pub bytes_written: u64,

    /// Duration of the build.
    pub duration: Duration,
}

impl BuildReport {
    /// Creates an empty report for `format`.
    #[must_use]
    pub fn new(format: ArchiveFormat) -> Self {
        Self {
            format,
            files_added: 0,
            directories_added: 0,
            symlinks_added: 0,
            content_bytes: 0,
            bytes_written: 0,
            duration: Duration::ZERO,
        }
    }

    /// Total number of entries written.
    #[must_use]
    pub fn total_entries(&self) -> usize {
        self.files_added + self.directories_added + self.symlinks_added
    }

    /// Container size relative to content size (`bytes_written /
    /// content_bytes`).
    ///
    /// Returns 0.0 when no content was written.
    ///
    /// # Examples
    ///
    /// ```
    /// use packrat_core::BuildReport;
    /// use packrat_core::types::ArchiveFormat;
    ///
    /// let mut report = BuildReport::new(ArchiveFormat::Zip);
    /// assert_eq!(report.overhead_ratio(), 0.0);
    ///
    /// report.content_bytes = 1000;
    /// report.bytes_written = 1500;
    /// assert_eq!(report.overhead_ratio(), 1.5);
    /// ```
    #[must_use]
    pub fn overhead_ratio(&self) -> f64 {
        if self.content_bytes == 0 {
            return 0.0;
        }
        self.bytes_written as f64 / self.content_bytes as f64
    }
}
