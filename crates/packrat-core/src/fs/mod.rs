//! Filesystem collaborator.
//!
//! The resolver and writers never touch `std::fs` directly; they go through
//! [`FileSystem`], so an in-memory tree can stand in for the disk in tests.

mod memory;
mod os;

pub use memory::ListingOrder;
pub use memory::MemoryFileSystem;
pub use os::OsFileSystem;

use std::ffi::OsString;
use std::io;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

/// Kind of a filesystem node as reported by [`FileSystem::metadata`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link (not followed).
    Symlink,
    /// Anything else (fifo, socket, device); cannot be archived.
    Other,
}

/// Metadata of a single node, without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeMetadata {
    /// Node kind.
    pub kind: NodeKind,
    /// Length in bytes (meaningful for files only).
    pub len: u64,
    /// Modification time in seconds since the Unix epoch, clamped at 0.
    pub mtime: u64,
    /// Permission bits, when the platform exposes them.
    pub mode: Option<u32>,
}

/// Read-only view of a filesystem.
///
/// Implementations must be shareable across threads: independent roots are
/// resolved in parallel.
pub trait FileSystem: Send + Sync {
    /// Returns metadata for `path` without following a final symlink.
    fn metadata(&self, path: &Path) -> io::Result<NodeMetadata>;

    /// Lists the names of the children of directory `path`, in any order.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>>;

    /// Returns the target of symlink `path`.
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// Opens file `path` for sequential reading.
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send + '_>>;
}

impl<F: FileSystem + ?Sized> FileSystem for &F {
    fn metadata(&self, path: &Path) -> io::Result<NodeMetadata> {
        (**self).metadata(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        (**self).read_dir(path)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).read_link(path)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send + '_>> {
        (**self).open(path)
    }
}
