//! Deterministic, streaming construction of tar and zip archives.
//!
//! `packrat-core` turns an ordered list of files and directories into a
//! single container whose bytes depend only on the inputs: directories are
//! expanded in sorted order, headers carry no host-specific owner data, and
//! content is streamed in bounded chunks so memory use does not grow with
//! file size.
//!
//! The pipeline has three stages:
//!
//! - [`resolver`] expands roots into a flat, duplicate-free entry list
//! - [`writer`] encodes entries as ustar or zip records
//! - [`builder`] validates the job, runs both stages and applies the failure
//!   policy
//!
//! # Examples
//!
//! ```no_run
//! use packrat_core::BuildConfig;
//! use packrat_core::create_archive;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BuildConfig::default();
//! let report = create_archive("docs.tar.gz", &["docs/"], &config)?;
//! println!("Wrote {} bytes", report.bytes_written);
//! # Ok(())
//! # }
//! ```
//!
//! Building into memory with an in-memory filesystem:
//!
//! ```
//! use packrat_core::ArchiveJob;
//! use packrat_core::CancellationToken;
//! use packrat_core::build;
//! use packrat_core::fs::MemoryFileSystem;
//! use packrat_core::io::MemorySink;
//! use packrat_core::types::ArchiveFormat;
//!
//! let mut fs = MemoryFileSystem::new();
//! fs.add_file("/docs/a.txt", b"hello").add_file("/docs/b.txt", b"0123456789");
//!
//! let job = ArchiveJob::new(ArchiveFormat::Tar).with_root("/docs");
//! let mut sink = MemorySink::new();
//! let report = build(&job, &fs, &mut sink, &CancellationToken::new())?;
//! assert_eq!(report.bytes_written, 3584);
//! # Ok::<(), packrat_core::ArchiveError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod builder;
pub mod cancel;
pub mod config;
pub mod error;
pub mod filters;
pub mod fs;
pub mod io;
pub mod report;
pub mod resolver;
pub mod types;
pub mod writer;

pub use api::create_archive;
pub use builder::ArchiveBuilder;
pub use builder::ArchiveJob;
pub use builder::build;
pub use cancel::CancellationToken;
pub use config::BuildConfig;
pub use error::ArchiveError;
pub use error::Result;
pub use report::BuildReport;
