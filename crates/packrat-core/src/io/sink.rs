//! Destination sinks.
//!
//! A sink is an append-only byte stream with an explicit lifecycle:
//!
//! 1. `prepare` checks that the destination is writable; no content yet.
//! 2. `begin` is called once resolution succeeded, right before the first
//!    container byte.
//! 3. `finalize` flushes and closes after the last byte.
//! 4. `discard` is called instead of `finalize` when a build is abandoned
//!    before writing started, or cancelled.

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

const FILE_BUFFER_SIZE: usize = 64 * 1024;

/// Sequential destination for container bytes.
pub trait ArchiveSink: Write {
    /// Verifies the destination can be written. Must not write content.
    fn prepare(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Called right before the first container byte is written.
    fn begin(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Flushes and closes the destination after the last byte.
    fn finalize(&mut self) -> io::Result<()> {
        self.flush()
    }

    /// Abandons the destination. A destination this sink created is removed;
    /// a pre-existing one is left as is.
    fn discard(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: ArchiveSink + ?Sized> ArchiveSink for &mut S {
    fn prepare(&mut self) -> io::Result<()> {
        (**self).prepare()
    }

    fn begin(&mut self) -> io::Result<()> {
        (**self).begin()
    }

    fn finalize(&mut self) -> io::Result<()> {
        (**self).finalize()
    }

    fn discard(&mut self) -> io::Result<()> {
        (**self).discard()
    }
}

/// Sink writing to a file on disk.
///
/// The file is opened (and created if needed) by `prepare` without
/// truncation, so a build that fails validation or resolution leaves an
/// existing file untouched and removes a file it created.
///
/// # Examples
///
/// ```no_run
/// use packrat_core::io::ArchiveSink;
/// use packrat_core::io::FileSink;
/// use std::io::Write;
///
/// let mut sink = FileSink::new("out.tar");
/// sink.prepare()?;
/// sink.begin()?;
/// sink.write_all(&[0u8; 1024])?;
/// sink.finalize()?;
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Option<BufWriter<File>>,
    created: bool,
}

impl FileSink {
    /// Creates a sink for `path`. Nothing is touched until `prepare`.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
            created: false,
        }
    }

    /// Destination path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `prepare` created the file (it did not exist before).
    #[must_use]
    pub const fn created(&self) -> bool {
        self.created
    }

    fn file(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.file.as_mut().ok_or_else(|| {
            io::Error::other(format!(
                "destination {} is not open",
                self.path.display()
            ))
        })
    }
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl ArchiveSink for FileSink {
    fn prepare(&mut self) -> io::Result<()> {
        if self.path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", self.path.display()),
            ));
        }

        let existed = self.path.symlink_metadata().is_ok();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        self.created = !existed;
        self.file = Some(BufWriter::with_capacity(FILE_BUFFER_SIZE, file));
        Ok(())
    }

    fn begin(&mut self) -> io::Result<()> {
        self.file()?.get_ref().set_len(0)
    }

    fn finalize(&mut self) -> io::Result<()> {
        let file = self.file()?;
        file.flush()?;
        file.get_ref().sync_all()?;
        self.file = None;
        Ok(())
    }

    fn discard(&mut self) -> io::Result<()> {
        self.file = None;
        if self.created {
            self.created = false;
            match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }
        Ok(())
    }
}

/// Sink collecting the container in memory.
///
/// `discard` keeps whatever was written, so a cancelled or failed build can
/// be inspected.
///
/// # Examples
///
/// ```
/// use packrat_core::io::ArchiveSink;
/// use packrat_core::io::MemorySink;
/// use std::io::Write;
///
/// let mut sink = MemorySink::new();
/// sink.begin()?;
/// sink.write_all(b"abc")?;
/// assert_eq!(sink.as_bytes(), b"abc");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Vec<u8>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the sink and returns its bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ArchiveSink for MemorySink {
    fn begin(&mut self) -> io::Result<()> {
        self.buffer.clear();
        Ok(())
    }
}
