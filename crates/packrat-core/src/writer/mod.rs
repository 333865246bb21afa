//! Container encoders.
//!
//! Both encoders consume resolved [`Entry`] values one at a time and write
//! each entry as a whole (header, content, padding) before returning, so a
//! stream cut at an entry boundary holds only complete records.

pub mod tar;
pub mod zip;

pub use self::tar::TarWriter;
pub use self::zip::ZipWriter;

use std::io;
use std::io::Read;
use std::io::Write;

use crate::ArchiveError;
use crate::Result;
use crate::types::Entry;

/// A container format encoder.
pub trait ContainerWriter {
    /// Writes one complete entry. `content` must be `Some` for files and is
    /// ignored for other kinds.
    fn append(&mut self, entry: &Entry, content: Option<&mut dyn Read>) -> Result<()>;

    /// Writes the trailer records and flushes.
    fn finish(&mut self) -> Result<()>;
}

/// Streams exactly `entry.size` bytes from `reader` into `out` in chunks of
/// `buffer.len()`, feeding every chunk to `observe` before it is written.
///
/// Never writes more than `entry.size` bytes. If the source yields fewer
/// bytes the result is [`ArchiveError::SizeMismatch`] with the actual length.
/// If it yields more, reading stops at the first chunk that crosses the
/// declared size and `actual` is the number of bytes read so far, which is a
/// lower bound on the real length.
pub(crate) fn stream_content<W, O>(
    entry: &Entry,
    reader: &mut dyn Read,
    out: &mut W,
    buffer: &mut [u8],
    mut observe: O,
) -> Result<u64>
where
    W: Write + ?Sized,
    O: FnMut(&[u8]),
{
    let expected = entry.size;
    let mut streamed = 0u64;

    loop {
        let n = match reader.read(buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_error(entry, e)),
        };

        if streamed + n as u64 > expected {
            return Err(ArchiveError::SizeMismatch {
                path: entry.source.clone(),
                expected,
                actual: streamed + n as u64,
            });
        }

        let chunk = &buffer[..n];
        observe(chunk);
        out.write_all(chunk)
            .map_err(|e| ArchiveError::write(format!("content of '{}'", entry.name), e))?;
        streamed += n as u64;
    }

    if streamed != expected {
        return Err(ArchiveError::SizeMismatch {
            path: entry.source.clone(),
            expected,
            actual: streamed,
        });
    }
    Ok(streamed)
}

fn read_error(entry: &Entry, source: io::Error) -> ArchiveError {
    ArchiveError::write(format!("reading {}", entry.source.display()), source)
}
