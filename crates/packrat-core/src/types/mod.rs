//! Core value types shared by the resolver, writers and builder.

mod entry;
mod format;

pub use entry::DEFAULT_DIR_MODE;
pub use entry::DEFAULT_FILE_MODE;
pub use entry::DEFAULT_SYMLINK_MODE;
pub use entry::Entry;
pub use entry::EntryKind;
pub use format::ArchiveFormat;
pub use format::detect_format;
