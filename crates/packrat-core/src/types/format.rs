//! Container formats and detection from destination paths.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::ArchiveError;
use crate::Result;

/// Supported output container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// POSIX ustar archive.
    Tar,
    /// Ustar archive wrapped in a single gzip member.
    TarGz,
    /// PKZIP archive.
    Zip,
}

impl ArchiveFormat {
    /// Canonical file extension, without the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArchiveFormat {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tar" => Ok(Self::Tar),
            "tar.gz" | "tgz" | "targz" => Ok(Self::TarGz),
            "zip" => Ok(Self::Zip),
            other => Err(ArchiveError::validation(format!(
                "unsupported archive format '{other}' (expected tar, tar.gz or zip)"
            ))),
        }
    }
}

/// Detects the container format from a destination path's extension.
///
/// # Errors
///
/// Returns [`ArchiveError::Validation`] if the extension is missing or not
/// one of `.tar`, `.tar.gz`, `.tgz`, `.zip`.
///
/// # Examples
///
/// ```
/// use packrat_core::types::ArchiveFormat;
/// use packrat_core::types::detect_format;
/// use std::path::Path;
///
/// assert_eq!(detect_format(Path::new("out.tar.gz"))?, ArchiveFormat::TarGz);
/// assert!(detect_format(Path::new("out.rar")).is_err());
/// # Ok::<(), packrat_core::ArchiveError>(())
/// ```
pub fn detect_format(path: &Path) -> Result<ArchiveFormat> {
    let unsupported = || {
        ArchiveError::validation(format!(
            "cannot determine archive format from '{}'",
            path.display()
        ))
    };

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(unsupported)?;

    match extension.to_ascii_lowercase().as_str() {
        "tar" => Ok(ArchiveFormat::Tar),
        "tgz" => Ok(ArchiveFormat::TarGz),
        "gz" => {
            let stem_is_tar = path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s.to_ascii_lowercase().ends_with(".tar"));
            if stem_is_tar {
                Ok(ArchiveFormat::TarGz)
            } else {
                Err(unsupported())
            }
        }
        "zip" => Ok(ArchiveFormat::Zip),
        _ => Err(unsupported()),
    }
}
