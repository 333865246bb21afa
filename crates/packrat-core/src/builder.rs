//! Archive build orchestration.
//!
//! A build runs in three phases:
//!
//! 1. Validation: the job is checked and the sink is prepared. Nothing is
//!    written.
//! 2. Resolution: every root is expanded into a sorted, duplicate-free entry
//!    list. Still nothing is written.
//! 3. Writing: entries are streamed to the sink in order, followed by the
//!    container trailer.
//!
//! Failures in phases 1 and 2, and cancellation, discard the sink. Failures
//! while writing leave the destination as far as it got.

use std::io::Read;
use std::io::Write;
use std::mem;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use flate2::Compression;
use flate2::GzBuilder;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::ArchiveError;
use crate::CancellationToken;
use crate::Result;
use crate::config::BuildConfig;
use crate::fs::FileSystem;
use crate::fs::OsFileSystem;
use crate::io::ArchiveSink;
use crate::io::CountingWriter;
use crate::io::FileSink;
use crate::report::BuildReport;
use crate::resolver::resolve_skipping;
use crate::types::ArchiveFormat;
use crate::types::Entry;
use crate::types::EntryKind;
use crate::types::detect_format;
use crate::writer::ContainerWriter;
use crate::writer::TarWriter;
use crate::writer::ZipWriter;

/// Everything needed to build one archive, apart from the filesystem and the
/// destination.
///
/// # Examples
///
/// ```
/// use packrat_core::ArchiveJob;
/// use packrat_core::types::ArchiveFormat;
///
/// let job = ArchiveJob::new(ArchiveFormat::Zip)
///     .with_root("/srv/site")
///     .with_root("/srv/README.md");
/// assert_eq!(job.roots().len(), 2);
/// assert!(job.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveJob {
    roots: Vec<PathBuf>,
    skipped: Vec<PathBuf>,
    format: ArchiveFormat,
    config: BuildConfig,
}

impl ArchiveJob {
    /// Creates a job with no roots and the default configuration.
    pub fn new(format: ArchiveFormat) -> Self {
        Self {
            roots: Vec::new(),
            skipped: Vec::new(),
            format,
            config: BuildConfig::default(),
        }
    }

    /// Appends a root path. Roots are archived in the order they are added.
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.roots.push(root.as_ref().to_path_buf());
        self
    }

    /// Appends several root paths.
    pub fn with_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.roots
            .extend(roots.into_iter().map(|root| root.as_ref().to_path_buf()));
        self
    }

    /// Leaves `path` out of every directory walk. Naming it as a root is a
    /// validation error.
    ///
    /// Paths are compared as given, so `path` must be spelled the way the
    /// walk reaches it (under one of the roots).
    pub fn with_skipped_path(mut self, path: impl AsRef<Path>) -> Self {
        self.skipped.push(path.as_ref().to_path_buf());
        self
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    /// Root paths in archive order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Container format to produce.
    pub const fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Build configuration.
    pub const fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Checks the job without touching the filesystem.
    pub fn validate(&self) -> Result<()> {
        if self.roots.is_empty() {
            return Err(ArchiveError::validation("no root paths given"));
        }
        self.config.validate()
    }
}

/// Builds one archive from `job` into `sink`.
///
/// Entries are written in resolution order: roots in the order given, each
/// followed by its descendants in pre-order with siblings sorted by name.
/// The output depends only on the job and the filesystem contents, never on
/// enumeration order or timing.
///
/// `cancel` is checked before every entry; a cancelled build stops at an
/// entry boundary.
///
/// # Examples
///
/// ```
/// use packrat_core::ArchiveJob;
/// use packrat_core::CancellationToken;
/// use packrat_core::build;
/// use packrat_core::fs::MemoryFileSystem;
/// use packrat_core::io::MemorySink;
/// use packrat_core::types::ArchiveFormat;
///
/// let mut fs = MemoryFileSystem::new();
/// fs.add_file("/data/notes.txt", b"remember the milk");
///
/// let job = ArchiveJob::new(ArchiveFormat::Tar).with_root("/data");
/// let mut sink = MemorySink::new();
/// let report = build(&job, &fs, &mut sink, &CancellationToken::new())?;
///
/// assert_eq!(report.files_added, 1);
/// assert_eq!(report.directories_added, 1);
/// assert_eq!(sink.as_bytes().len() as u64, report.bytes_written);
/// # Ok::<(), packrat_core::ArchiveError>(())
/// ```
///
/// # Errors
///
/// - [`ArchiveError::Validation`] for an empty root list, an invalid
///   configuration or a destination that cannot be prepared
/// - [`ArchiveError::EntryResolution`] and [`ArchiveError::DuplicateEntry`]
///   from resolution; nothing has been written
/// - [`ArchiveError::Cancelled`] if `cancel` fired
/// - [`ArchiveError::SizeMismatch`] and [`ArchiveError::Write`] while
///   writing; the destination holds a partial archive
pub fn build<F, S>(
    job: &ArchiveJob,
    fs: &F,
    sink: &mut S,
    cancel: &CancellationToken,
) -> Result<BuildReport>
where
    F: FileSystem + ?Sized,
    S: ArchiveSink + ?Sized,
{
    let start = Instant::now();
    job.validate()?;

    sink.prepare()
        .map_err(|e| ArchiveError::validation(format!("destination is not writable: {e}")))?;

    let entries = match resolve_skipping(fs, &job.roots, &job.config, &job.skipped) {
        Ok(entries) => entries,
        Err(err) => {
            discard(sink);
            return Err(err);
        }
    };
    debug!(entries = entries.len(), format = %job.format, "resolved archive entries");

    if let Err(e) = sink.begin() {
        discard(sink);
        return Err(ArchiveError::write("starting destination", e));
    }

    let mut report = BuildReport::new(job.format);
    let mut out = CountingWriter::new(&mut *sink);

    match write_container(job, &entries, fs, &mut out, cancel, &mut report) {
        Ok(()) => {}
        Err(ArchiveError::Cancelled) => {
            warn!(
                written = report.total_entries(),
                remaining = entries.len() - report.total_entries(),
                "archive build cancelled"
            );
            discard(sink);
            return Err(ArchiveError::Cancelled);
        }
        Err(err) => {
            warn!(error = %err, bytes = out.total_bytes(), "archive build failed, destination left partial");
            if let Err(e) = out.flush() {
                debug!(error = %e, "flush after failure also failed");
            }
            return Err(err);
        }
    }

    report.bytes_written = out.total_bytes();
    sink.finalize()
        .map_err(|e| ArchiveError::write("finalizing destination", e))?;

    report.duration = start.elapsed();
    info!(
        format = %job.format,
        entries = report.total_entries(),
        bytes = report.bytes_written,
        "archive built"
    );
    Ok(report)
}

fn discard<S: ArchiveSink + ?Sized>(sink: &mut S) {
    if let Err(e) = sink.discard() {
        warn!(error = %e, "failed to discard destination");
    }
}

fn write_container<F, W>(
    job: &ArchiveJob,
    entries: &[Entry],
    fs: &F,
    out: W,
    cancel: &CancellationToken,
    report: &mut BuildReport,
) -> Result<()>
where
    F: FileSystem + ?Sized,
    W: Write,
{
    let config = &job.config;
    match job.format {
        ArchiveFormat::Tar => {
            let mut writer = TarWriter::new(out, config.chunk_size);
            write_entries(&mut writer, entries, fs, cancel, report)?;
            writer.finish()
        }
        ArchiveFormat::TarGz => {
            let encoder = GzBuilder::new()
                .mtime(0)
                .write(out, Compression::new(config.gzip_level));
            let mut writer = TarWriter::new(encoder, config.chunk_size);
            let written = write_entries(&mut writer, entries, fs, cancel, report)
                .and_then(|()| writer.finish());
            let mut encoder = writer.into_inner();
            if let Err(err) = written {
                // A partial stream must not end in a gzip trailer, and dropping
                // the encoder writes one.
                if let Err(e) = encoder.flush() {
                    debug!(error = %e, "flushing gzip stream after failure");
                }
                mem::forget(encoder);
                return Err(err);
            }
            encoder
                .finish()
                .map_err(|e| ArchiveError::write("finishing gzip stream", e))?;
            Ok(())
        }
        ArchiveFormat::Zip => {
            let mut writer = ZipWriter::new(out, config.zip_compression, config.chunk_size);
            write_entries(&mut writer, entries, fs, cancel, report)?;
            writer.finish()
        }
    }
}

fn write_entries<C, F>(
    writer: &mut C,
    entries: &[Entry],
    fs: &F,
    cancel: &CancellationToken,
    report: &mut BuildReport,
) -> Result<()>
where
    C: ContainerWriter,
    F: FileSystem + ?Sized,
{
    for entry in entries {
        if cancel.is_cancelled() {
            return Err(ArchiveError::Cancelled);
        }

        match &entry.kind {
            EntryKind::File => {
                let mut reader = fs.open(&entry.source).map_err(|e| {
                    ArchiveError::write(format!("opening {}", entry.source.display()), e)
                })?;
                writer.append(entry, Some(reader.as_mut() as &mut dyn Read))?;
                report.files_added += 1;
                report.content_bytes += entry.size;
            }
            EntryKind::Directory => {
                writer.append(entry, None)?;
                report.directories_added += 1;
            }
            EntryKind::Symlink { .. } => {
                writer.append(entry, None)?;
                report.symlinks_added += 1;
            }
        }
    }
    Ok(())
}

/// Fluent interface for building an archive on disk.
///
/// # Examples
///
/// ```no_run
/// use packrat_core::ArchiveBuilder;
///
/// let report = ArchiveBuilder::new()
///     .output("site.tar.gz")
///     .add_source("public/")
///     .add_source("robots.txt")
///     .build()?;
///
/// println!("Packed {} files", report.files_added);
/// # Ok::<(), packrat_core::ArchiveError>(())
/// ```
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    output: Option<PathBuf>,
    format: Option<ArchiveFormat>,
    sources: Vec<PathBuf>,
    config: BuildConfig,
    cancel: Option<CancellationToken>,
}

impl ArchiveBuilder {
    /// Creates a builder with default settings.
    ///
    /// # Examples
    ///
    /// ```
    /// use packrat_core::ArchiveBuilder;
    ///
    /// let builder = ArchiveBuilder::new();
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the archive path.
    ///
    /// The format is detected from the extension unless set with
    /// [`format`](Self::format).
    #[must_use]
    pub fn output<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the container format explicitly.
    #[must_use]
    pub fn format(mut self, format: ArchiveFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Adds a root file or directory.
    #[must_use]
    pub fn add_source<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.sources.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds several roots, keeping their order.
    ///
    /// # Examples
    ///
    /// ```
    /// use packrat_core::ArchiveBuilder;
    ///
    /// let builder = ArchiveBuilder::new().add_sources(&["src", "Cargo.toml"]);
    /// ```
    #[must_use]
    pub fn add_sources<P: AsRef<Path>>(mut self, paths: &[P]) -> Self {
        self.sources
            .extend(paths.iter().map(|p| p.as_ref().to_path_buf()));
        self
    }

    /// Replaces the build configuration.
    #[must_use]
    pub fn config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `token` to allow cancelling the build from another thread.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Resolves the sources and writes the archive.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Validation`] if no output was set or the
    /// format cannot be detected, plus every error of [`build`].
    pub fn build(self) -> Result<BuildReport> {
        let output = self
            .output
            .ok_or_else(|| ArchiveError::validation("output path not set"))?;
        let format = match self.format {
            Some(format) => format,
            None => detect_format(&output)?,
        };

        let mut job = ArchiveJob::new(format)
            .with_roots(&self.sources)
            .with_config(self.config);
        for skipped in destination_under_roots(&output, &self.sources) {
            debug!(path = %skipped.display(), "destination lies inside a source");
            job = job.with_skipped_path(skipped);
        }
        let mut sink = FileSink::new(&output);
        let cancel = self.cancel.unwrap_or_default();

        debug!(output = %output.display(), %format, roots = job.roots().len(), "building archive");
        build(&job, &OsFileSystem::new(), &mut sink, &cancel)
    }
}

/// Spells `output` the way a walk of each root containing it would reach
/// it, so the archive never ends up inside itself.
///
/// The output file may not exist yet, so its parent is canonicalized instead.
fn destination_under_roots(output: &Path, roots: &[PathBuf]) -> Vec<PathBuf> {
    let Some(file_name) = output.file_name() else {
        return Vec::new();
    };
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Ok(destination) = std::fs::canonicalize(parent).map(|dir| dir.join(file_name)) else {
        return Vec::new();
    };

    roots
        .iter()
        .filter_map(|root| {
            let canonical_root = std::fs::canonicalize(root).ok()?;
            let relative = destination.strip_prefix(&canonical_root).ok()?;
            Some(root.join(relative))
        })
        .collect()
}
