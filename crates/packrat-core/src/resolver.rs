//! Entry resolution: turning caller roots into an ordered entry list.
//!
//! Output order is fully determined by the roots and the filesystem
//! contents: roots keep caller order, directories precede their children,
//! and children are visited in byte order of their names regardless of how
//! the filesystem enumerates them.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use rayon::prelude::*;
use tracing::debug;

use crate::ArchiveError;
use crate::Result;
use crate::config::BuildConfig;
use crate::filters;
use crate::fs::FileSystem;
use crate::fs::NodeKind;
use crate::types::Entry;
use crate::types::EntryKind;

/// Resolves `roots` into a flat, deterministically ordered entry list.
///
/// Independent roots are walked in parallel; the merge that detects
/// duplicate names runs in root order. Resolution is all-or-nothing: the
/// first failure (in root order) is returned and no entries are.
///
/// # Examples
///
/// ```
/// use packrat_core::BuildConfig;
/// use packrat_core::fs::MemoryFileSystem;
/// use packrat_core::resolver::resolve;
/// use std::path::PathBuf;
///
/// let mut fs = MemoryFileSystem::new();
/// fs.add_file("/in/docs/b.txt", b"bb").add_file("/in/docs/a.txt", b"a");
///
/// let entries = resolve(&fs, &[PathBuf::from("/in/docs")], &BuildConfig::default())?;
/// let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
/// assert_eq!(names, ["docs", "docs/a.txt", "docs/b.txt"]);
/// # Ok::<(), packrat_core::ArchiveError>(())
/// ```
///
/// # Errors
///
/// - [`ArchiveError::Validation`] if a root has no final path component
/// - [`ArchiveError::EntryResolution`] if a path cannot be stat'ed, listed
///   or read, has an unsupported type, or has a non-UTF-8 name or target
/// - [`ArchiveError::DuplicateEntry`] if two entries share a name
pub fn resolve<F, P>(fs: &F, roots: &[P], config: &BuildConfig) -> Result<Vec<Entry>>
where
    F: FileSystem + ?Sized,
    P: AsRef<Path>,
{
    resolve_skipping(fs, roots, config, &[])
}

/// Like [`resolve`], but paths in `skipped` are left out of directory walks.
///
/// Used to keep the archive being written out of its own contents. A root
/// that is itself skipped is a [`ArchiveError::Validation`] error.
pub(crate) fn resolve_skipping<F, P>(
    fs: &F,
    roots: &[P],
    config: &BuildConfig,
    skipped: &[PathBuf],
) -> Result<Vec<Entry>>
where
    F: FileSystem + ?Sized,
    P: AsRef<Path>,
{
    let named_roots = roots
        .iter()
        .map(|root| {
            let root = root.as_ref();
            if skipped.iter().any(|skip| skip == root) {
                return Err(ArchiveError::validation(format!(
                    "'{}' is both a source and the archive destination",
                    root.display()
                )));
            }
            root_name(root).map(|name| (root.to_path_buf(), name))
        })
        .collect::<Result<Vec<_>>>()?;

    let walked: Vec<Result<Vec<Entry>>> = named_roots
        .par_iter()
        .map(|(path, name)| walk_root(fs, path, name, config, skipped))
        .collect();

    let mut entries = Vec::new();
    let mut claimed: HashMap<String, PathBuf> = HashMap::new();
    for root_entries in walked {
        for entry in root_entries? {
            if let Some(first) = claimed.get(&entry.name) {
                return Err(ArchiveError::DuplicateEntry {
                    name: entry.name,
                    first: first.clone(),
                    second: entry.source,
                });
            }
            claimed.insert(entry.name.clone(), entry.source.clone());
            entries.push(entry);
        }
    }

    debug!(roots = roots.len(), entries = entries.len(), "resolution complete");
    Ok(entries)
}

/// Archive name of a root: its final path component.
fn root_name(root: &Path) -> Result<String> {
    let name = root.file_name().ok_or_else(|| {
        ArchiveError::validation(format!(
            "root '{}' has no file name to use in the archive",
            root.display()
        ))
    })?;
    name.to_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| ArchiveError::resolution(root, non_utf8("file name")))
}

/// Walks one root iteratively in pre-order.
fn walk_root<F>(
    fs: &F,
    root: &Path,
    root_name: &str,
    config: &BuildConfig,
    skipped: &[PathBuf],
) -> Result<Vec<Entry>>
where
    F: FileSystem + ?Sized,
{
    let mut entries = Vec::new();
    let mut pending = vec![(root.to_path_buf(), root_name.to_owned())];

    while let Some((path, name)) = pending.pop() {
        let metadata = fs
            .metadata(&path)
            .map_err(|e| ArchiveError::resolution(&path, e))?;

        let kind = match metadata.kind {
            NodeKind::File => {
                // Unreadable files must fail here, before anything is written.
                fs.open(&path)
                    .map_err(|e| ArchiveError::resolution(&path, e))?;
                EntryKind::File
            }
            NodeKind::Directory => EntryKind::Directory,
            NodeKind::Symlink => {
                let target = fs
                    .read_link(&path)
                    .map_err(|e| ArchiveError::resolution(&path, e))?;
                let target = target
                    .to_str()
                    .ok_or_else(|| ArchiveError::resolution(&path, non_utf8("symlink target")))?
                    .to_owned();
                EntryKind::Symlink { target }
            }
            NodeKind::Other => {
                return Err(ArchiveError::resolution(
                    &path,
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "unsupported file type (not a file, directory or symlink)",
                    ),
                ));
            }
        };

        if kind.is_directory() {
            let mut children = fs
                .read_dir(&path)
                .map_err(|e| ArchiveError::resolution(&path, e))?
                .into_iter()
                .map(|child| {
                    child.into_string().map_err(|raw| {
                        ArchiveError::resolution(path.join(raw), non_utf8("file name"))
                    })
                })
                .collect::<Result<Vec<String>>>()?;
            children.retain(|child| !filters::is_excluded(child, &config.exclude_patterns));
            children.sort_unstable();

            // Reversed so the smallest name is popped first.
            for child in children.into_iter().rev() {
                let child_path = path.join(&child);
                if skipped.contains(&child_path) {
                    debug!(path = %child_path.display(), "skipping archive destination");
                    continue;
                }
                pending.push((child_path, format!("{name}/{child}")));
            }
        }

        let size = if kind.is_file() { metadata.len } else { 0 };
        entries.push(Entry {
            source: path,
            name,
            kind,
            size,
            mtime: config.mtime_override.unwrap_or(metadata.mtime),
            mode: if config.preserve_permissions {
                metadata.mode
            } else {
                None
            },
        });
    }

    debug!(root = %root.display(), entries = entries.len(), "root resolved");
    Ok(entries)
}

fn non_utf8(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("{what} is not valid UTF-8"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fs::ListingOrder;
    use crate::fs::MemoryFileSystem;

    fn names(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    fn tree() -> MemoryFileSystem {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/in/docs/b.txt", b"0123456789")
            .add_file("/in/docs/a.txt", b"01234")
            .add_file("/in/docs/sub/z.txt", b"z")
            .add_file("/in/docs/c.txt", b"")
            .add_file("/in/notes.md", b"# notes");
        fs
    }

    #[test]
    fn test_directory_precedes_sorted_children() {
        let entries = resolve(&tree(), &["/in/docs"], &BuildConfig::default()).unwrap();
        assert_eq!(
            names(&entries),
            [
                "docs",
                "docs/a.txt",
                "docs/b.txt",
                "docs/c.txt",
                "docs/sub",
                "docs/sub/z.txt"
            ]
        );
        assert!(entries[0].kind.is_directory());
        assert_eq!(entries[0].size, 0);
        assert_eq!(entries[1].size, 5);
        assert_eq!(entries[2].size, 10);
    }

    #[test]
    fn test_roots_keep_caller_order() {
        let entries = resolve(
            &tree(),
            &["/in/notes.md", "/in/docs/sub"],
            &BuildConfig::default(),
        )
        .unwrap();
        assert_eq!(names(&entries), ["notes.md", "sub", "sub/z.txt"]);
    }

    #[test]
    fn test_enumeration_order_irrelevant() {
        let sorted = resolve(&tree(), &["/in"], &BuildConfig::default()).unwrap();
        for order in [
            ListingOrder::Reversed,
            ListingOrder::Shuffled(1),
            ListingOrder::Shuffled(99),
        ] {
            let fs = tree().with_listing_order(order);
            let entries = resolve(&fs, &["/in"], &BuildConfig::default()).unwrap();
            assert_eq!(entries, sorted);
        }
    }

    #[test]
    fn test_trailing_slash_root() {
        let entries = resolve(&tree(), &["/in/docs/sub/"], &BuildConfig::default()).unwrap();
        assert_eq!(names(&entries), ["sub", "sub/z.txt"]);
    }

    #[test]
    fn test_symlink_recorded_not_followed() {
        let mut fs = MemoryFileSystem::new();
        fs.add_dir("/in/loop").add_symlink("/in/loop/self", "/in/loop");

        let entries = resolve(&fs, &["/in/loop"], &BuildConfig::default()).unwrap();
        assert_eq!(names(&entries), ["loop", "loop/self"]);
        assert_eq!(
            entries[1].kind,
            EntryKind::Symlink {
                target: "/in/loop".into()
            }
        );
        assert_eq!(entries[1].size, 0);
    }

    #[test]
    fn test_duplicate_names_across_roots() {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/one/report.txt", b"1")
            .add_file("/two/report.txt", b"2");

        let err = resolve(
            &fs,
            &["/one/report.txt", "/two/report.txt"],
            &BuildConfig::default(),
        )
        .unwrap_err();
        match err {
            ArchiveError::DuplicateEntry {
                name,
                first,
                second,
            } => {
                assert_eq!(name, "report.txt");
                assert_eq!(first, PathBuf::from("/one/report.txt"));
                assert_eq!(second, PathBuf::from("/two/report.txt"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_same_root_twice_is_duplicate() {
        let err = resolve(&tree(), &["/in/docs", "/in/docs"], &BuildConfig::default());
        assert!(matches!(err, Err(ArchiveError::DuplicateEntry { .. })));
    }

    #[test]
    fn test_missing_root() {
        let err = resolve(&tree(), &["/in/missing"], &BuildConfig::default()).unwrap_err();
        match err {
            ArchiveError::EntryResolution { path, source } => {
                assert_eq!(path, PathBuf::from("/in/missing"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unreadable_directory() {
        let mut fs = tree();
        fs.deny("/in/docs/sub");
        let err = resolve(&fs, &["/in/docs"], &BuildConfig::default()).unwrap_err();
        assert_eq!(err.path(), Some(Path::new("/in/docs/sub")));
        assert!(matches!(
            err,
            ArchiveError::EntryResolution { ref source, .. }
                if source.kind() == io::ErrorKind::PermissionDenied
        ));
    }

    #[test]
    fn test_unreadable_file() {
        let mut fs = tree();
        fs.deny("/in/docs/b.txt");
        let err = resolve(&fs, &["/in/docs"], &BuildConfig::default()).unwrap_err();
        assert_eq!(err.path(), Some(Path::new("/in/docs/b.txt")));
        assert!(err.is_pre_write());
        assert!(matches!(
            err,
            ArchiveError::EntryResolution { ref source, .. }
                if source.kind() == io::ErrorKind::PermissionDenied
        ));
    }

    #[test]
    fn test_skipped_path_left_out_of_walk() {
        let skipped = [PathBuf::from("/in/docs/b.txt")];
        let entries =
            resolve_skipping(&tree(), &["/in/docs"], &BuildConfig::default(), &skipped).unwrap();
        assert_eq!(
            names(&entries),
            ["docs", "docs/a.txt", "docs/c.txt", "docs/sub", "docs/sub/z.txt"]
        );
    }

    #[test]
    fn test_skipped_root_rejected() {
        let skipped = [PathBuf::from("/in/notes.md")];
        let err = resolve_skipping(&tree(), &["/in/notes.md"], &BuildConfig::default(), &skipped);
        assert!(matches!(err, Err(ArchiveError::Validation { .. })));
    }

    #[test]
    fn test_root_without_name_rejected() {
        let err = resolve(&tree(), &["/"], &BuildConfig::default());
        assert!(matches!(err, Err(ArchiveError::Validation { .. })));
    }

    #[test]
    fn test_exclude_patterns_prune_subtrees() {
        let config = BuildConfig::default().with_exclude_patterns(vec!["sub".into(), "*.md".into()]);
        let entries = resolve(&tree(), &["/in"], &config).unwrap();
        assert_eq!(
            names(&entries),
            ["in", "in/docs", "in/docs/a.txt", "in/docs/b.txt", "in/docs/c.txt"]
        );
    }

    #[test]
    fn test_excluded_root_still_included() {
        let config = BuildConfig::default().with_exclude_patterns(vec!["*.md".into()]);
        let entries = resolve(&tree(), &["/in/notes.md"], &config).unwrap();
        assert_eq!(names(&entries), ["notes.md"]);
    }

    #[test]
    fn test_metadata_overrides() {
        let mut fs = tree();
        fs.set_mtime("/in/notes.md", 1_234).set_mode("/in/notes.md", Some(0o600));

        let entries = resolve(&fs, &["/in/notes.md"], &BuildConfig::default()).unwrap();
        assert_eq!(entries[0].mtime, 1_234);
        assert_eq!(entries[0].mode, Some(0o600));

        let config = BuildConfig::default()
            .with_preserve_permissions(false)
            .with_mtime_override(Some(42));
        let entries = resolve(&fs, &["/in/notes.md"], &config).unwrap();
        assert_eq!(entries[0].mtime, 42);
        assert_eq!(entries[0].mode, None);
        assert_eq!(entries[0].permissions(), 0o644);
    }
}
