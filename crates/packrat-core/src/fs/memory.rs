//! In-memory filesystem for tests and embedding.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::io::Cursor;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use super::FileSystem;
use super::NodeKind;
use super::NodeMetadata;
use crate::types::DEFAULT_DIR_MODE;
use crate::types::DEFAULT_FILE_MODE;
use crate::types::DEFAULT_SYMLINK_MODE;

/// Order in which [`MemoryFileSystem::read_dir`] reports children.
///
/// Real filesystems make no ordering promise; the non-sorted orders let
/// tests prove that output does not depend on enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingOrder {
    /// Ascending by name.
    #[default]
    Sorted,
    /// Descending by name.
    Reversed,
    /// Pseudo-random permutation derived from the seed.
    Shuffled(u64),
}

#[derive(Debug, Clone)]
enum Content {
    File(Vec<u8>),
    Directory,
    Symlink(PathBuf),
}

#[derive(Debug, Clone)]
struct Node {
    content: Content,
    mtime: u64,
    mode: Option<u32>,
    readable: bool,
}

/// A filesystem tree held entirely in memory.
///
/// Adding a node creates any missing ancestor directories.
///
/// # Examples
///
/// ```
/// use packrat_core::fs::FileSystem;
/// use packrat_core::fs::MemoryFileSystem;
/// use std::path::Path;
///
/// let mut fs = MemoryFileSystem::new();
/// fs.add_file("/docs/a.txt", b"hello").add_dir("/docs/empty");
///
/// let mut names = fs.read_dir(Path::new("/docs"))?;
/// names.sort();
/// assert_eq!(names, ["a.txt", "empty"]);
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    nodes: BTreeMap<PathBuf, Node>,
    order: ListingOrder,
}

impl MemoryFileSystem {
    /// Creates an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the order in which directory children are reported.
    #[must_use]
    pub fn with_listing_order(mut self, order: ListingOrder) -> Self {
        self.order = order;
        self
    }

    /// Adds (or replaces) a regular file.
    pub fn add_file(&mut self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> &mut Self {
        self.insert(
            path.as_ref(),
            Content::File(contents.as_ref().to_vec()),
            DEFAULT_FILE_MODE,
        );
        self
    }

    /// Adds a directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.insert(path.as_ref(), Content::Directory, DEFAULT_DIR_MODE);
        self
    }

    /// Adds a symlink pointing at `target`.
    pub fn add_symlink(&mut self, path: impl AsRef<Path>, target: impl AsRef<Path>) -> &mut Self {
        self.insert(
            path.as_ref(),
            Content::Symlink(target.as_ref().to_path_buf()),
            DEFAULT_SYMLINK_MODE,
        );
        self
    }

    /// Sets the modification time of an existing node.
    pub fn set_mtime(&mut self, path: impl AsRef<Path>, mtime: u64) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(path.as_ref()) {
            node.mtime = mtime;
        }
        self
    }

    /// Sets (or clears) the permission bits of an existing node.
    pub fn set_mode(&mut self, path: impl AsRef<Path>, mode: Option<u32>) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(path.as_ref()) {
            node.mode = mode;
        }
        self
    }

    /// Makes a node unreadable: its metadata stays visible but listing or
    /// opening it fails with `PermissionDenied`.
    pub fn deny(&mut self, path: impl AsRef<Path>) -> &mut Self {
        if let Some(node) = self.nodes.get_mut(path.as_ref()) {
            node.readable = false;
        }
        self
    }

    fn insert(&mut self, path: &Path, content: Content, mode: u32) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.nodes
                .entry(ancestor.to_path_buf())
                .or_insert_with(|| Node {
                    content: Content::Directory,
                    mtime: 0,
                    mode: Some(DEFAULT_DIR_MODE),
                    readable: true,
                });
        }
        self.nodes.insert(
            path.to_path_buf(),
            Node {
                content,
                mtime: 0,
                mode: Some(mode),
                readable: true,
            },
        );
    }

    fn node(&self, path: &Path) -> io::Result<&Node> {
        self.nodes.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file or directory: {}", path.display()),
            )
        })
    }

    fn readable_node(&self, path: &Path) -> io::Result<&Node> {
        let node = self.node(path)?;
        if node.readable {
            Ok(node)
        } else {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            ))
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn metadata(&self, path: &Path) -> io::Result<NodeMetadata> {
        let node = self.node(path)?;
        let (kind, len) = match &node.content {
            Content::File(data) => (NodeKind::File, data.len() as u64),
            Content::Directory => (NodeKind::Directory, 0),
            Content::Symlink(_) => (NodeKind::Symlink, 0),
        };
        Ok(NodeMetadata {
            kind,
            len,
            mtime: node.mtime,
            mode: node.mode,
        })
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let node = self.readable_node(path)?;
        if !matches!(node.content, Content::Directory) {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {}", path.display()),
            ));
        }

        let mut names: Vec<OsString> = self
            .nodes
            .keys()
            .filter(|candidate| candidate.parent() == Some(path))
            .filter_map(|candidate| candidate.file_name().map(ToOwned::to_owned))
            .collect();

        match self.order {
            ListingOrder::Sorted => {}
            ListingOrder::Reversed => names.reverse(),
            ListingOrder::Shuffled(seed) => shuffle(&mut names, seed),
        }
        Ok(names)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        match &self.node(path)?.content {
            Content::Symlink(target) => Ok(target.clone()),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a symlink: {}", path.display()),
            )),
        }
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send + '_>> {
        match &self.readable_node(path)?.content {
            Content::File(data) => Ok(Box::new(Cursor::new(data.as_slice()))),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            )),
        }
    }
}

/// Fisher-Yates driven by xorshift64; stable for a given seed.
fn shuffle<T>(items: &mut [T], seed: u64) {
    let mut state = seed | 1;
    for i in (1..items.len()).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let j = (state % (i as u64 + 1)) as usize;
        items.swap(i, j);
    }
}
