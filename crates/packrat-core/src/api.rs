//! High-level public API for archive creation.

use std::path::Path;

use crate::ArchiveBuilder;
use crate::BuildConfig;
use crate::BuildReport;
use crate::Result;

/// Creates an archive at `output` from `sources` on the local filesystem.
///
/// The format is detected from the output extension (`.tar`, `.tar.gz`,
/// `.tgz`, `.zip`). Sources are archived in the order given, each under its
/// final path component.
///
/// # Errors
///
/// Returns an error if:
/// - the extension is not a supported format, or `sources` is empty
/// - a source is missing, unreadable or collides with another by name
/// - reading a source or writing the archive fails
///
/// # Examples
///
/// ```no_run
/// use packrat_core::BuildConfig;
/// use packrat_core::create_archive;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = BuildConfig::default().with_mtime_override(Some(0));
/// let report = create_archive("release.zip", &["bin/", "README.md"], &config)?;
/// println!("Created archive with {} files", report.files_added);
/// # Ok(())
/// # }
/// ```
pub fn create_archive<P: AsRef<Path>, Q: AsRef<Path>>(
    output: P,
    sources: &[Q],
    config: &BuildConfig,
) -> Result<BuildReport> {
    ArchiveBuilder::new()
        .output(output)
        .add_sources(sources)
        .config(config.clone())
        .build()
}
