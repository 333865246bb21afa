//! Streaming zip encoder.
//!
//! Entries are written without seeking: every local header carries bit 3 of
//! the general purpose flags, zeroed CRC and `0xFFFFFFFF` sizes plus an empty
//! zip64 extra field, and the real values follow the content in a zip64 data
//! descriptor. The central directory repeats them, switching to zip64 fields
//! only when a value does not fit in 32 bits.

use std::io;
use std::io::Read;
use std::io::Write;

use flate2::Compression;
use flate2::write::DeflateEncoder;
use tracing::trace;

use super::ContainerWriter;
use super::stream_content;
use crate::ArchiveError;
use crate::Result;
use crate::config::ZipCompression;
use crate::io::CountingWriter;
use crate::types::Entry;
use crate::types::EntryKind;

const LOCAL_FILE_HEADER_SIG: u32 = 0x0403_4B50;
const DATA_DESCRIPTOR_SIG: u32 = 0x0807_4B50;
const CENTRAL_DIRECTORY_SIG: u32 = 0x0201_4B50;
const END_OF_CENTRAL_DIR_SIG: u32 = 0x0605_4B50;
const ZIP64_EOCD_RECORD_SIG: u32 = 0x0606_4B50;
const ZIP64_EOCD_LOCATOR_SIG: u32 = 0x0706_4B50;

const VERSION_NEEDED: u16 = 0x002d;
const VERSION_MADE_BY: u16 = 0x032d;

// Bit 3: sizes in data descriptor. Bit 11: names are UTF-8.
const FLAGS: u16 = (1 << 3) | (1 << 11);

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATE: u16 = 8;

const ZIP64_EXTRA_ID: u16 = 0x0001;

const S_IFREG: u32 = 0o100_000;
const S_IFDIR: u32 = 0o040_000;
const S_IFLNK: u32 = 0o120_000;
const DOS_DIRECTORY: u32 = 0x10;

#[derive(Debug)]
struct CentralRecord {
    name: Vec<u8>,
    method: u16,
    time: u16,
    date: u16,
    crc32: u32,
    compressed_size: u64,
    uncompressed_size: u64,
    offset: u64,
    external_attrs: u32,
}

/// Streaming zip writer.
///
/// Local records are emitted as entries are appended; the central directory
/// is held in memory and written by [`ContainerWriter::finish`].
#[derive(Debug)]
pub struct ZipWriter<W: Write> {
    out: CountingWriter<W>,
    compression: ZipCompression,
    records: Vec<CentralRecord>,
    buffer: Vec<u8>,
}

impl<W: Write> ZipWriter<W> {
    /// Creates a writer that streams file content in `chunk_size` pieces.
    pub fn new(out: W, compression: ZipCompression, chunk_size: usize) -> Self {
        Self {
            out: CountingWriter::new(out),
            compression,
            records: Vec::new(),
            buffer: vec![0; chunk_size.max(1)],
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn emit(&mut self, bytes: &[u8], context: impl FnOnce() -> String) -> Result<()> {
        self.out
            .write_all(bytes)
            .map_err(|e| ArchiveError::write(context(), e))
    }

    /// Streams file content, returning (method, crc32, compressed, uncompressed).
    fn write_file_data(&mut self, entry: &Entry, reader: &mut dyn Read) -> Result<(u16, u32, u64, u64)> {
        let mut hasher = crc32fast::Hasher::new();
        let start = self.out.total_bytes();

        match self.compression {
            ZipCompression::Stored => {
                let n = stream_content(entry, reader, &mut self.out, &mut self.buffer, |chunk| {
                    hasher.update(chunk);
                })?;
                Ok((METHOD_STORED, hasher.finalize(), n, n))
            }
            ZipCompression::Deflate { level } => {
                let mut encoder = DeflateEncoder::new(&mut self.out, Compression::new(level));
                let n = stream_content(entry, reader, &mut encoder, &mut self.buffer, |chunk| {
                    hasher.update(chunk);
                })?;
                encoder
                    .try_finish()
                    .map_err(|e| ArchiveError::write(format!("compressing '{}'", entry.name), e))?;
                drop(encoder);
                let compressed = self.out.total_bytes() - start;
                Ok((METHOD_DEFLATE, hasher.finalize(), compressed, n))
            }
        }
    }
}

impl<W: Write> ContainerWriter for ZipWriter<W> {
    fn append(&mut self, entry: &Entry, content: Option<&mut dyn Read>) -> Result<()> {
        let name = entry.archive_name().into_owned().into_bytes();
        let (date, time) = dos_date_time(entry.mtime);
        let offset = self.out.total_bytes();

        let method = match (&entry.kind, self.compression) {
            (EntryKind::File, ZipCompression::Deflate { .. }) => METHOD_DEFLATE,
            _ => METHOD_STORED,
        };
        let header = local_header(&name, method, time, date);
        self.emit(&header, || format!("header of '{}'", entry.name))?;

        let (method, crc32, compressed_size, uncompressed_size) = match &entry.kind {
            EntryKind::File => {
                let Some(reader) = content else {
                    return Err(ArchiveError::write(
                        format!("content of '{}'", entry.name),
                        io::Error::other("no content source for file entry"),
                    ));
                };
                self.write_file_data(entry, reader)?
            }
            EntryKind::Directory => (METHOD_STORED, 0, 0, 0),
            EntryKind::Symlink { target } => {
                let payload = target.as_bytes();
                self.emit(payload, || format!("link target of '{}'", entry.name))?;
                let len = payload.len() as u64;
                (METHOD_STORED, crc32fast::hash(payload), len, len)
            }
        };

        let mut descriptor = Vec::with_capacity(24);
        put_u32(&mut descriptor, DATA_DESCRIPTOR_SIG);
        put_u32(&mut descriptor, crc32);
        put_u64(&mut descriptor, compressed_size);
        put_u64(&mut descriptor, uncompressed_size);
        self.emit(&descriptor, || format!("data descriptor of '{}'", entry.name))?;

        trace!(name = %entry.name, offset, compressed_size, uncompressed_size, "zip entry written");

        self.records.push(CentralRecord {
            name,
            method,
            time,
            date,
            crc32,
            compressed_size,
            uncompressed_size,
            offset,
            external_attrs: external_attributes(entry),
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let directory_offset = self.out.total_bytes();

        let mut directory = Vec::new();
        for record in &self.records {
            central_header(&mut directory, record);
        }
        self.emit(&directory, || "central directory".into())?;

        let directory_size = directory.len() as u64;
        let mut trailer = Vec::with_capacity(98);
        end_of_central_directory(&mut trailer, self.records.len() as u64, directory_size, directory_offset);
        self.emit(&trailer, || "end of central directory".into())?;

        self.out
            .flush()
            .map_err(|e| ArchiveError::write("flushing zip stream", e))
    }
}

fn local_header(name: &[u8], method: u16, time: u16, date: u16) -> Vec<u8> {
    let mut buf = Vec::with_capacity(30 + name.len() + 20);
    put_u32(&mut buf, LOCAL_FILE_HEADER_SIG);
    put_u16(&mut buf, VERSION_NEEDED);
    put_u16(&mut buf, FLAGS);
    put_u16(&mut buf, method);
    put_u16(&mut buf, time);
    put_u16(&mut buf, date);
    put_u32(&mut buf, 0);
    put_u32(&mut buf, u32::MAX);
    put_u32(&mut buf, u32::MAX);
    put_u16(&mut buf, name.len() as u16);
    put_u16(&mut buf, 20);
    buf.extend_from_slice(name);

    put_u16(&mut buf, ZIP64_EXTRA_ID);
    put_u16(&mut buf, 16);
    put_u64(&mut buf, 0);
    put_u64(&mut buf, 0);
    buf
}

fn central_header(buf: &mut Vec<u8>, record: &CentralRecord) {
    let limit = u64::from(u32::MAX);
    let need_zip64 = record.compressed_size >= limit
        || record.uncompressed_size >= limit
        || record.offset >= limit;

    let (compressed, uncompressed, offset) = if need_zip64 {
        (u32::MAX, u32::MAX, u32::MAX)
    } else {
        (
            record.compressed_size as u32,
            record.uncompressed_size as u32,
            record.offset as u32,
        )
    };

    put_u32(buf, CENTRAL_DIRECTORY_SIG);
    put_u16(buf, VERSION_MADE_BY);
    put_u16(buf, VERSION_NEEDED);
    put_u16(buf, FLAGS);
    put_u16(buf, record.method);
    put_u16(buf, record.time);
    put_u16(buf, record.date);
    put_u32(buf, record.crc32);
    put_u32(buf, compressed);
    put_u32(buf, uncompressed);
    put_u16(buf, record.name.len() as u16);
    put_u16(buf, if need_zip64 { 28 } else { 0 });
    put_u16(buf, 0); // comment length
    put_u16(buf, 0); // disk number start
    put_u16(buf, 0); // internal attributes
    put_u32(buf, record.external_attrs);
    put_u32(buf, offset);
    buf.extend_from_slice(&record.name);

    if need_zip64 {
        put_u16(buf, ZIP64_EXTRA_ID);
        put_u16(buf, 3 * 8 + 4);
        put_u64(buf, record.uncompressed_size);
        put_u64(buf, record.compressed_size);
        put_u64(buf, record.offset);
        put_u32(buf, 0);
    }
}

fn end_of_central_directory(buf: &mut Vec<u8>, count: u64, size: u64, offset: u64) {
    let limit = u64::from(u32::MAX);
    let need_zip64 = count >= u64::from(u16::MAX) || size >= limit || offset >= limit;

    if need_zip64 {
        put_u32(buf, ZIP64_EOCD_RECORD_SIG);
        put_u64(buf, 44);
        put_u16(buf, VERSION_MADE_BY);
        put_u16(buf, VERSION_NEEDED);
        put_u32(buf, 0);
        put_u32(buf, 0);
        put_u64(buf, count);
        put_u64(buf, count);
        put_u64(buf, size);
        put_u64(buf, offset);

        put_u32(buf, ZIP64_EOCD_LOCATOR_SIG);
        put_u32(buf, 0);
        put_u64(buf, offset + size);
        put_u32(buf, 1);
    }

    let (count, size, offset) = if need_zip64 {
        (u16::MAX, u32::MAX, u32::MAX)
    } else {
        (count as u16, size as u32, offset as u32)
    };

    put_u32(buf, END_OF_CENTRAL_DIR_SIG);
    put_u16(buf, 0);
    put_u16(buf, 0);
    put_u16(buf, count);
    put_u16(buf, count);
    put_u32(buf, size);
    put_u32(buf, offset);
    put_u16(buf, 0);
}

fn external_attributes(entry: &Entry) -> u32 {
    let permissions = entry.permissions();
    match entry.kind {
        EntryKind::File => (S_IFREG | permissions) << 16,
        EntryKind::Directory => ((S_IFDIR | permissions) << 16) | DOS_DIRECTORY,
        EntryKind::Symlink { .. } => (S_IFLNK | permissions) << 16,
    }
}

/// Converts seconds since the Unix epoch (UTC) to MS-DOS (date, time).
///
/// DOS timestamps have two-second resolution and cover 1980 to 2107; times
/// outside that range clamp to its ends.
pub fn dos_date_time(mtime: u64) -> (u16, u16) {
    let days = mtime / 86_400;
    let secs = mtime % 86_400;
    let (year, month, day) = civil_from_days(days);

    if year < 1980 {
        return ((1 << 5) | 1, 0);
    }
    if year > 2107 {
        return ((127 << 9) | (12 << 5) | 31, (23 << 11) | (59 << 5) | 29);
    }

    let hour = secs / 3600;
    let minute = secs % 3600 / 60;
    let second = secs % 60;

    let date = ((year - 1980) << 9) | (month << 5) | day;
    let time = (hour << 11) | (minute << 5) | (second / 2);
    (date as u16, time as u16)
}

/// Days since 1970-01-01 to a proleptic Gregorian (year, month, day).
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn entry(name: &str, kind: EntryKind, size: u64) -> Entry {
        Entry {
            source: PathBuf::from("/src").join(name),
            name: name.into(),
            kind,
            size,
            mtime: 1_577_836_800,
            mode: Some(0o600),
        }
    }

    fn build(entries: &[(Entry, &[u8])], compression: ZipCompression) -> Vec<u8> {
        let mut writer = ZipWriter::new(Vec::new(), compression, 16);
        for (entry, content) in entries {
            let mut cursor = Cursor::new(content.to_vec());
            let reader: Option<&mut dyn Read> = if entry.kind.is_file() {
                Some(&mut cursor)
            } else {
                None
            };
            writer.append(entry, reader).unwrap();
        }
        writer.finish().unwrap();
        writer.into_inner()
    }

    #[test]
    fn test_dos_date_time() {
        assert_eq!(dos_date_time(1_577_836_800), (20513, 0));
        // 2000-02-29 12:34:56
        assert_eq!(dos_date_time(951_827_696), (10333, 25692));
    }

    #[test]
    fn test_dos_date_time_clamps_before_1980() {
        assert_eq!(dos_date_time(0), (33, 0));
        assert_eq!(dos_date_time(315_532_799), (33, 0));
        assert_eq!(dos_date_time(315_532_800), (33, 0));
    }

    #[test]
    fn test_civil_from_days() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(11_016), (2000, 2, 29));
        assert_eq!(civil_from_days(18_262), (2020, 1, 1));
    }

    #[test]
    fn test_local_header_layout() {
        let header = local_header(b"a.txt", METHOD_STORED, 0, 20513);
        assert_eq!(header.len(), 30 + 5 + 20);
        assert_eq!(&header[..4], &LOCAL_FILE_HEADER_SIG.to_le_bytes());
        assert_eq!(&header[6..8], &FLAGS.to_le_bytes());
        assert_eq!(&header[18..26], &[0xFF; 8]);
        assert_eq!(&header[35..37], &ZIP64_EXTRA_ID.to_le_bytes());
    }

    #[test]
    fn test_external_attributes() {
        let file = entry("f", EntryKind::File, 0);
        assert_eq!(external_attributes(&file), 0o100_600 << 16);

        let mut dir = entry("d", EntryKind::Directory, 0);
        dir.mode = None;
        assert_eq!(external_attributes(&dir), (0o040_755 << 16) | 0x10);
    }

    #[test]
    fn test_readable_by_zip_crate() {
        let link = EntryKind::Symlink {
            target: "docs/readme.md".into(),
        };
        let data = build(
            &[
                (entry("docs", EntryKind::Directory, 0), b""),
                (entry("docs/readme.md", EntryKind::File, 12), b"hello, world"),
                (entry("latest", link, 0), b""),
            ],
            ZipCompression::Stored,
        );

        let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
        assert_eq!(archive.len(), 3);

        assert!(archive.by_index(0).unwrap().is_dir());
        assert_eq!(archive.by_index(0).unwrap().name(), "docs/");

        let mut file = archive.by_name("docs/readme.md").unwrap();
        let mut body = String::new();
        file.read_to_string(&mut body).unwrap();
        assert_eq!(body, "hello, world");
        assert_eq!(file.unix_mode(), Some(0o100_600));
        drop(file);

        let mut link = archive.by_name("latest").unwrap();
        assert!(link.is_symlink());
        let mut target = String::new();
        link.read_to_string(&mut target).unwrap();
        assert_eq!(target, "docs/readme.md");
    }

    #[test]
    fn test_deflate_round_trip() {
        let content = "deterministic ".repeat(200);
        let data = build(
            &[(entry("big.txt", EntryKind::File, content.len() as u64), content.as_bytes())],
            ZipCompression::Deflate { level: 6 },
        );
        assert!(data.len() < content.len());

        let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
        let mut file = archive.by_index(0).unwrap();
        assert_eq!(file.compression(), zip::CompressionMethod::Deflated);
        let mut body = String::new();
        file.read_to_string(&mut body).unwrap();
        assert_eq!(body, content);
    }

    #[test]
    fn test_empty_archive_is_bare_eocd() {
        let data = build(&[], ZipCompression::Stored);
        assert_eq!(data.len(), 22);
        assert_eq!(&data[..4], &END_OF_CENTRAL_DIR_SIG.to_le_bytes());
    }

    #[test]
    fn test_zip64_eocd_when_offsets_overflow() {
        let mut buf = Vec::new();
        end_of_central_directory(&mut buf, 2, 100, u64::from(u32::MAX) + 10);
        assert_eq!(buf.len(), 56 + 20 + 22);
        assert_eq!(&buf[..4], &ZIP64_EOCD_RECORD_SIG.to_le_bytes());
        assert_eq!(&buf[56..60], &ZIP64_EOCD_LOCATOR_SIG.to_le_bytes());
        assert_eq!(&buf[76..80], &END_OF_CENTRAL_DIR_SIG.to_le_bytes());
    }

    #[test]
    fn test_zip64_eocd_at_entry_count_sentinel() {
        let mut buf = Vec::new();
        end_of_central_directory(&mut buf, u64::from(u16::MAX) - 1, 100, 1000);
        assert_eq!(buf.len(), 22);

        let mut buf = Vec::new();
        end_of_central_directory(&mut buf, u64::from(u16::MAX), 100, 1000);
        assert_eq!(buf.len(), 56 + 20 + 22);
        assert_eq!(&buf[24..32], &u64::from(u16::MAX).to_le_bytes());
    }
}
