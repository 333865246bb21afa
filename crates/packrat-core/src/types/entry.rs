//! Resolved archive entries.

use std::borrow::Cow;
use std::path::PathBuf;

/// Permission bits applied to files whose mode is unknown or not preserved.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Permission bits applied to directories whose mode is unknown or not
/// preserved.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Permission bits applied to symlinks.
pub const DEFAULT_SYMLINK_MODE: u32 = 0o777;

/// Kind of filesystem object an [`Entry`] describes.
///
/// # Examples
///
/// ```
/// use packrat_core::types::EntryKind;
///
/// let link = EntryKind::Symlink {
///     target: "../shared/config.toml".into(),
/// };
/// assert!(link.is_symlink());
/// assert!(!EntryKind::File.is_directory());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file; content is streamed from the source path.
    File,

    /// Directory; carries no content.
    Directory,

    /// Symbolic link. The target is stored verbatim and never followed.
    Symlink {
        /// Link target as read from the filesystem.
        target: String,
    },
}

impl EntryKind {
    /// Returns `true` if this is a regular file.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    /// Returns `true` if this is a directory.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Returns `true` if this is a symlink.
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink { .. })
    }
}

/// One filesystem object, resolved and ready to be written.
///
/// `name` is archive-relative, uses `/` separators and has neither a leading
/// nor a trailing slash; writers add the trailing slash for directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Path the entry was resolved from.
    pub source: PathBuf,

    /// Archive-relative name, unique within one archive.
    pub name: String,

    /// File, directory or symlink.
    pub kind: EntryKind,

    /// Content size in bytes (0 for directories and symlinks).
    pub size: u64,

    /// Modification time in seconds since the Unix epoch (UTC).
    pub mtime: u64,

    /// Permission bits, if the filesystem reported them.
    pub mode: Option<u32>,
}

impl Entry {
    /// Permission bits to record, falling back to the per-kind default.
    ///
    /// # Examples
    ///
    /// ```
    /// use packrat_core::types::Entry;
    /// use packrat_core::types::EntryKind;
    ///
    /// let dir = Entry {
    ///     source: "/tmp/docs".into(),
    ///     name: "docs".into(),
    ///     kind: EntryKind::Directory,
    ///     size: 0,
    ///     mtime: 0,
    ///     mode: None,
    /// };
    /// assert_eq!(dir.permissions(), 0o755);
    /// ```
    #[must_use]
    pub fn permissions(&self) -> u32 {
        let default = match self.kind {
            EntryKind::File => DEFAULT_FILE_MODE,
            EntryKind::Directory => DEFAULT_DIR_MODE,
            EntryKind::Symlink { .. } => DEFAULT_SYMLINK_MODE,
        };
        self.mode.map_or(default, |mode| mode & 0o7777)
    }

    /// Name as it appears in the container: directories end with `/`.
    #[must_use]
    pub fn archive_name(&self) -> Cow<'_, str> {
        if self.kind.is_directory() {
            Cow::Owned(format!("{}/", self.name))
        } else {
            Cow::Borrowed(&self.name)
        }
    }
}
