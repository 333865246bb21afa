//! POSIX ustar encoder.
//!
//! Headers are encoded field by field so every byte of the output is a
//! function of the entry alone: uid and gid are 0, owner names are empty and
//! the device fields are zero. Names that do not fit the 100-byte name field
//! are split across the 155-byte prefix field; names or link targets that
//! still do not fit get a PAX extended header (`x`) in front of the entry.

use std::io::Read;
use std::io::Write;

use super::ContainerWriter;
use super::stream_content;
use crate::ArchiveError;
use crate::Result;
use crate::types::Entry;
use crate::types::EntryKind;

/// Size of one tar block.
pub const BLOCK_SIZE: usize = 512;

const NAME_LEN: usize = 100;
const PREFIX_LEN: usize = 155;
const PAX_HEADER_NAME: &str = "././@PaxHeader";

const TYPE_FILE: u8 = b'0';
const TYPE_SYMLINK: u8 = b'2';
const TYPE_DIRECTORY: u8 = b'5';
const TYPE_PAX: u8 = b'x';

// (offset, length) of each ustar header field.
const NAME: (usize, usize) = (0, 100);
const MODE: (usize, usize) = (100, 8);
const UID: (usize, usize) = (108, 8);
const GID: (usize, usize) = (116, 8);
const SIZE: (usize, usize) = (124, 12);
const MTIME: (usize, usize) = (136, 12);
const CHECKSUM: (usize, usize) = (148, 8);
const TYPEFLAG: usize = 156;
const LINKNAME: (usize, usize) = (157, 100);
const MAGIC: (usize, usize) = (257, 6);
const VERSION: (usize, usize) = (263, 2);
const DEVMAJOR: (usize, usize) = (329, 8);
const DEVMINOR: (usize, usize) = (337, 8);
const PREFIX: (usize, usize) = (345, 155);

/// Streaming ustar writer.
///
/// Each call to [`ContainerWriter::append`] emits the header block(s), the
/// content and its zero padding; [`ContainerWriter::finish`] emits the two
/// zero blocks that end the archive.
#[derive(Debug)]
pub struct TarWriter<W: Write> {
    out: W,
    buffer: Vec<u8>,
}

impl<W: Write> TarWriter<W> {
    /// Creates a writer that streams file content in `chunk_size` pieces.
    pub fn new(out: W, chunk_size: usize) -> Self {
        Self {
            out,
            buffer: vec![0; chunk_size.max(1)],
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_block(&mut self, block: &[u8], entry: &Entry) -> Result<()> {
        self.out
            .write_all(block)
            .map_err(|e| ArchiveError::write(format!("header of '{}'", entry.name), e))
    }

    fn write_padding(&mut self, len: u64, entry: &Entry) -> Result<()> {
        let padding = padding_for(len);
        if padding > 0 {
            self.out
                .write_all(&[0u8; BLOCK_SIZE][..padding])
                .map_err(|e| ArchiveError::write(format!("padding of '{}'", entry.name), e))?;
        }
        Ok(())
    }
}

impl<W: Write> ContainerWriter for TarWriter<W> {
    fn append(&mut self, entry: &Entry, content: Option<&mut dyn Read>) -> Result<()> {
        let name = entry.archive_name();
        let (typeflag, size, link) = match &entry.kind {
            EntryKind::File => (TYPE_FILE, entry.size, None),
            EntryKind::Directory => (TYPE_DIRECTORY, 0, None),
            EntryKind::Symlink { target } => (TYPE_SYMLINK, 0, Some(target.as_str())),
        };

        let split = split_name(&name);
        let long_link = link.is_some_and(|target| target.len() > NAME_LEN);

        if split.is_none() || long_link {
            let mut records = Vec::new();
            if split.is_none() {
                push_pax_record(&mut records, "path", &name);
            }
            if let Some(target) = link.filter(|_| long_link) {
                push_pax_record(&mut records, "linkpath", target);
            }

            let pax = HeaderFields {
                name: PAX_HEADER_NAME.as_bytes(),
                prefix: &[],
                mode: 0o644,
                size: records.len() as u64,
                mtime: entry.mtime,
                typeflag: TYPE_PAX,
                linkname: &[],
            };
            self.write_block(&encode_header(&pax), entry)?;
            self.out
                .write_all(&records)
                .map_err(|e| ArchiveError::write(format!("extended header of '{}'", entry.name), e))?;
            self.write_padding(records.len() as u64, entry)?;
        }

        let (prefix, short_name) = split.unwrap_or((&[][..], truncate(name.as_bytes(), NAME_LEN)));
        let fields = HeaderFields {
            name: short_name,
            prefix,
            mode: entry.permissions(),
            size,
            mtime: entry.mtime,
            typeflag,
            linkname: link.map_or(&[][..], |target| truncate(target.as_bytes(), NAME_LEN)),
        };
        self.write_block(&encode_header(&fields), entry)?;

        if entry.kind.is_file() {
            let Some(reader) = content else {
                return Err(ArchiveError::write(
                    format!("content of '{}'", entry.name),
                    std::io::Error::other("no content source for file entry"),
                ));
            };
            stream_content(entry, reader, &mut self.out, &mut self.buffer, |_| {})?;
            self.write_padding(entry.size, entry)?;
        }

        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out
            .write_all(&[0u8; 2 * BLOCK_SIZE])
            .map_err(|e| ArchiveError::write("end-of-archive marker", e))?;
        self.out
            .flush()
            .map_err(|e| ArchiveError::write("flushing tar stream", e))
    }
}

/// Zero bytes needed after `len` content bytes to reach a block boundary.
pub const fn padding_for(len: u64) -> usize {
    ((BLOCK_SIZE as u64 - len % BLOCK_SIZE as u64) % BLOCK_SIZE as u64) as usize
}

struct HeaderFields<'a> {
    name: &'a [u8],
    prefix: &'a [u8],
    mode: u32,
    size: u64,
    mtime: u64,
    typeflag: u8,
    linkname: &'a [u8],
}

fn encode_header(fields: &HeaderFields<'_>) -> [u8; BLOCK_SIZE] {
    let mut block = [0u8; BLOCK_SIZE];

    put_bytes(&mut block, NAME, fields.name);
    put_numeric(&mut block, MODE, u64::from(fields.mode));
    put_numeric(&mut block, UID, 0);
    put_numeric(&mut block, GID, 0);
    put_numeric(&mut block, SIZE, fields.size);
    put_numeric(&mut block, MTIME, fields.mtime);
    block[TYPEFLAG] = fields.typeflag;
    put_bytes(&mut block, LINKNAME, fields.linkname);
    put_bytes(&mut block, MAGIC, b"ustar\0");
    put_bytes(&mut block, VERSION, b"00");
    put_numeric(&mut block, DEVMAJOR, 0);
    put_numeric(&mut block, DEVMINOR, 0);
    put_bytes(&mut block, PREFIX, fields.prefix);

    let (offset, len) = CHECKSUM;
    block[offset..offset + len].fill(b' ');
    let checksum: u32 = block.iter().map(|&b| u32::from(b)).sum();
    let digits = format!("{checksum:06o}");
    block[offset..offset + 6].copy_from_slice(&digits.as_bytes()[digits.len() - 6..]);
    block[offset + 6] = 0;
    block[offset + 7] = b' ';

    block
}

fn put_bytes(block: &mut [u8], (offset, len): (usize, usize), value: &[u8]) {
    let n = value.len().min(len);
    block[offset..offset + n].copy_from_slice(&value[..n]);
}

/// Writes `value` as zero-padded octal followed by NUL, or in GNU base-256
/// form when it needs more digits than the field holds.
fn put_numeric(block: &mut [u8], (offset, len): (usize, usize), value: u64) {
    let field = &mut block[offset..offset + len];
    let digits = len - 1;

    if digits >= 22 || value < 1u64 << (3 * digits) {
        let text = format!("{value:0digits$o}");
        field[..digits].copy_from_slice(text.as_bytes());
        field[digits] = 0;
    } else {
        field.fill(0);
        let bytes = value.to_be_bytes();
        field[len - bytes.len()..].copy_from_slice(&bytes);
        field[0] |= 0x80;
    }
}

/// Splits `name` into ustar (prefix, name) fields, or `None` if it cannot be
/// represented without an extended header.
fn split_name(name: &str) -> Option<(&[u8], &[u8])> {
    let bytes = name.as_bytes();
    if bytes.len() <= NAME_LEN {
        return Some((&[], bytes));
    }

    // The trailing slash of a directory name must stay in the name field.
    let searchable = &bytes[..bytes.len() - 1];
    searchable
        .iter()
        .enumerate()
        .filter(|&(_, &b)| b == b'/')
        .map(|(i, _)| (&bytes[..i], &bytes[i + 1..]))
        .find(|(prefix, rest)| {
            !prefix.is_empty() && prefix.len() <= PREFIX_LEN && rest.len() <= NAME_LEN
        })
}

fn truncate(bytes: &[u8], len: usize) -> &[u8] {
    &bytes[..bytes.len().min(len)]
}

/// Appends one `"<len> <key>=<value>\n"` record, where `<len>` counts the
/// whole record including its own digits.
fn push_pax_record(records: &mut Vec<u8>, key: &str, value: &str) {
    let base = key.len() + value.len() + 3;
    let mut total = base + decimal_digits(base);
    if decimal_digits(total) != decimal_digits(base) {
        total = base + decimal_digits(total);
    }
    records.extend_from_slice(format!("{total} {key}={value}\n").as_bytes());
}

const fn decimal_digits(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}
