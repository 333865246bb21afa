//! `std::fs`-backed filesystem.

use std::ffi::OsString;
use std::fs;
use std::fs::File;
use std::fs::Metadata;
use std::io;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use super::FileSystem;
use super::NodeKind;
use super::NodeMetadata;

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    /// Creates a handle to the real filesystem.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FileSystem for OsFileSystem {
    fn metadata(&self, path: &Path) -> io::Result<NodeMetadata> {
        let metadata = fs::symlink_metadata(path)?;
        let file_type = metadata.file_type();
        let kind = if file_type.is_symlink() {
            NodeKind::Symlink
        } else if file_type.is_dir() {
            NodeKind::Directory
        } else if file_type.is_file() {
            NodeKind::File
        } else {
            NodeKind::Other
        };

        Ok(NodeMetadata {
            kind,
            len: if kind == NodeKind::File {
                metadata.len()
            } else {
                0
            },
            mtime: mtime_secs(&metadata),
            mode: permission_bits(&metadata),
        })
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        fs::read_dir(path)?
            .map(|child| child.map(|c| c.file_name()))
            .collect()
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(File::open(path)?))
    }
}

/// Seconds since the epoch; unreadable or pre-epoch times become 0.
fn mtime_secs(metadata: &Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs())
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn permission_bits(_metadata: &Metadata) -> Option<u32> {
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_metadata_kinds() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, b"hello").unwrap();

        let fs = OsFileSystem::new();
        let meta = fs.metadata(&file).unwrap();
        assert_eq!(meta.kind, NodeKind::File);
        assert_eq!(meta.len, 5);
        assert!(meta.mtime > 0);

        let dir_meta = fs.metadata(temp.path()).unwrap();
        assert_eq!(dir_meta.kind, NodeKind::Directory);
        assert_eq!(dir_meta.len, 0);
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = OsFileSystem
            .metadata(&temp.path().join("nope"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_read_dir_lists_names() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b"), b"").unwrap();
        fs::write(temp.path().join("a"), b"").unwrap();

        let mut names = OsFileSystem.read_dir(temp.path()).unwrap();
        names.sort();
        assert_eq!(names, vec![OsString::from("a"), OsString::from("b")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_not_followed() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink("target.txt", &link).unwrap();

        let meta = OsFileSystem.metadata(&link).unwrap();
        assert_eq!(meta.kind, NodeKind::Symlink);
        assert_eq!(
            OsFileSystem.read_link(&link).unwrap(),
            PathBuf::from("target.txt")
        );
    }
}
