//! I/O plumbing between the writers and the destination.
//!
//! This module provides the destination sink abstraction and the counting
//! wrapper used to report container size.

pub mod counting;
pub mod sink;

// Re-export main types for convenience
pub use counting::CountingWriter;
pub use sink::ArchiveSink;
pub use sink::FileSink;
pub use sink::MemorySink;
