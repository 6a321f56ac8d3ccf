//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures over an
//! in-memory buffer shared with the per-entry streams.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Walk the Central Directory one header at a time, on demand
//! 4. For extraction, read each file's Local File Header to locate its data
//!
//! Nothing beyond the EOCD is parsed up front; each call to
//! [`ZipArchive::read_entry`] decodes exactly one Central Directory header.

use async_trait::async_trait;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, trace};

use crate::error::UnzipError;

use super::EntrySource;
use super::names;
use super::stream::{EntryReader, SharedSlice};
use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Reader behaviour switches, taken from [`ExtractOptions`](crate::ExtractOptions).
#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    /// Check decompressed size and CRC-32 against the central directory
    pub validate_entry_sizes: bool,
    /// Reject backslashes in names instead of rewriting them to `/`
    pub strict_file_names: bool,
    /// Decode names as CP437/UTF-8 and validate them
    pub decode_strings: bool,
    /// Take mtime from the Info-ZIP extended timestamp (UTC) over the DOS fields
    pub extended_timestamps: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            validate_entry_sizes: true,
            strict_file_names: false,
            decode_strings: true,
            extended_timestamps: false,
        }
    }
}

fn invalid(what: impl Into<String>) -> anyhow::Error {
    UnzipError::InvalidArchive(what.into()).into()
}

/// ZIP archive opened over a shared byte buffer, iterated lazily.
///
/// ## Example
///
/// ```
/// use decompress_unzip::zip::{ReaderOptions, ZipArchive};
///
/// // An empty archive is just an EOCD record.
/// let mut empty = b"PK\x05\x06".to_vec();
/// empty.extend_from_slice(&[0u8; 18]);
///
/// let mut archive = ZipArchive::open(empty, ReaderOptions::default())?;
/// assert_eq!(archive.entry_count(), 0);
/// assert!(archive.read_entry()?.is_none());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct ZipArchive {
    /// The archive bytes, shared with every open entry stream
    data: Arc<[u8]>,
    options: ReaderOptions,
    /// Number of entries declared by the EOCD
    entry_count: u64,
    /// Entries handed out so far
    entries_read: u64,
    /// Offset of the next Central Directory header
    cd_cursor: u64,
    /// End of the Central Directory
    cd_end: u64,
    comment: String,
    closed: bool,
}

impl ZipArchive {
    /// Open an archive, reading only its end records.
    ///
    /// # Errors
    ///
    /// Fails if no EOCD can be found, if the archive spans multiple disks,
    /// or if the Central Directory lies outside the buffer.
    pub fn open(data: impl Into<Arc<[u8]>>, options: ReaderOptions) -> Result<Self> {
        let data = data.into();
        let mut archive = Self {
            data,
            options,
            entry_count: 0,
            entries_read: 0,
            cd_cursor: 0,
            cd_end: 0,
            comment: String::new(),
            closed: false,
        };

        let (eocd, eocd_offset) = archive.find_eocd()?;
        if eocd.disk_number != 0 || eocd.disk_with_cd != 0 {
            bail!(invalid("multi-disk zip files are not supported"));
        }

        // Get Central Directory info, using ZIP64 if needed
        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = archive.read_zip64_eocd(eocd_offset)?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        let cd_end = cd_offset
            .checked_add(cd_size)
            .filter(|end| *end <= eocd_offset)
            .ok_or_else(|| invalid("central directory is out of bounds"))?;

        let comment_start = eocd_offset + EndOfCentralDirectory::SIZE as u64;
        let comment_bytes = archive.slice(comment_start, eocd.comment_len as usize)?;
        // The archive comment has no UTF-8 flag of its own; CP437 is the default.
        archive.comment = names::decode(comment_bytes, false);

        archive.entry_count = total_entries;
        archive.cd_cursor = cd_offset;
        archive.cd_end = cd_end;

        debug!(
            entries = total_entries,
            cd_offset,
            cd_size,
            zip64 = eocd.is_zip64(),
            "opened zip archive"
        );

        Ok(archive)
    }

    /// Number of entries declared in the end records
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Archive-level comment
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Release the archive; further reads fail with [`UnzipError::Closed`].
    pub fn close(&mut self) {
        if !self.closed {
            debug!(read = self.entries_read, "closing zip archive");
        }
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Bounds-checked view into the buffer.
    fn slice(&self, offset: u64, len: usize) -> Result<&[u8]> {
        let end = offset
            .checked_add(len as u64)
            .filter(|end| *end <= self.len())
            .ok_or_else(|| invalid(format!("read of {len} bytes at {offset} is out of bounds")))?;
        Ok(&self.data[offset as usize..end as usize])
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// The EOCD is located at the end of the ZIP file. This method
    /// handles both the simple case (no comment) and archives with
    /// comments by searching backwards for the signature.
    fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let size = self.len();

        // Optimization: First try the simple case where there's no comment.
        if size >= EndOfCentralDirectory::SIZE as u64 {
            let offset = size - EndOfCentralDirectory::SIZE as u64;
            let buf = self.slice(offset, EndOfCentralDirectory::SIZE)?;

            // Check for signature and zero-length comment
            if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
                let eocd = EndOfCentralDirectory::from_bytes(buf)?;
                return Ok((eocd, offset));
            }
        }

        // EOCD not at expected location - search backwards, it may be
        // followed by a comment.
        let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64).min(size);
        let search_start = size - search_size;
        let buf = self.slice(search_start, search_size as usize)?;

        for i in (0..buf.len().saturating_sub(EndOfCentralDirectory::SIZE)).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                // The comment length field must match the remaining bytes.
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &buf[i..i + EndOfCentralDirectory::SIZE],
                    )?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        bail!(invalid("end of central directory record signature not found"))
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD indicates ZIP64 extensions are needed
    /// (fields set to 0xFFFF or 0xFFFFFFFF).
    fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD> {
        // The ZIP64 EOCD Locator is located immediately before the regular EOCD
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| invalid("missing ZIP64 end of central directory locator"))?;
        let locator = Zip64EOCDLocator::from_bytes(self.slice(locator_offset, Zip64EOCDLocator::SIZE)?)?;

        Zip64EOCD::from_bytes(self.slice(locator.eocd64_offset, Zip64EOCD::MIN_SIZE)?)
    }

    /// Parse the next Central Directory File Header.
    ///
    /// Returns `Ok(None)` once every declared entry has been read.
    pub fn read_entry(&mut self) -> Result<Option<ZipFileEntry>> {
        if self.closed {
            bail!(UnzipError::Closed);
        }
        if self.entries_read >= self.entry_count {
            return Ok(None);
        }

        let (entry, next) = self.parse_cdfh(self.cd_cursor)?;
        if next > self.cd_end {
            bail!(invalid("central directory record extends past its end"));
        }

        self.cd_cursor = next;
        self.entries_read += 1;
        trace!(name = %entry.file_name, index = self.entries_read - 1, "read entry");
        Ok(Some(entry))
    }

    /// Parse a Central Directory File Header at `offset`.
    ///
    /// Returns the entry and the offset of the header that follows it.
    fn parse_cdfh(&self, offset: u64) -> Result<(ZipFileEntry, u64)> {
        let header = self.slice(offset, CDFH_MIN_SIZE)?;
        let mut cursor = Cursor::new(header);

        // Read and verify the signature (PK\x01\x02)
        let mut sig = [0u8; 4];
        cursor.read_exact(&mut sig)?;
        if sig != CDFH_SIGNATURE {
            bail!(invalid("invalid central directory file header signature"));
        }

        // Read fixed-size header fields
        let version_made_by = cursor.read_u16::<LittleEndian>()?;
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let last_mod_time = cursor.read_u16::<LittleEndian>()?;
        let last_mod_date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let file_name_length = cursor.read_u16::<LittleEndian>()? as usize;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as usize;
        let file_comment_length = cursor.read_u16::<LittleEndian>()? as usize;
        let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let external_attrs = cursor.read_u32::<LittleEndian>()?;
        let lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

        let name_offset = offset + CDFH_MIN_SIZE as u64;
        let extra_offset = name_offset + file_name_length as u64;
        let comment_offset = extra_offset + extra_field_length as u64;
        let next = comment_offset + file_comment_length as u64;

        let name_bytes = self.slice(name_offset, file_name_length)?;
        let extra = self.slice(extra_offset, extra_field_length)?;
        let comment_bytes = self.slice(comment_offset, file_comment_length)?;

        let mut entry = ZipFileEntry {
            file_name: String::new(),
            version_made_by,
            flags,
            compression_method: CompressionMethod::from_u16(compression_method),
            compressed_size,
            uncompressed_size,
            crc32,
            lfh_offset,
            last_mod_time,
            last_mod_date,
            external_attrs,
            extended_mtime: None,
            comment: String::new(),
        };

        let unicode_name = parse_extra_fields(&mut entry, extra, name_bytes)?;
        if !self.options.extended_timestamps {
            entry.extended_mtime = None;
        }

        if self.options.decode_strings {
            let utf8 = flags & FLAG_UTF8 != 0;
            let name = unicode_name.unwrap_or_else(|| names::decode(name_bytes, utf8));
            entry.file_name = names::validate(&name, self.options.strict_file_names)?;
            entry.comment = names::decode(comment_bytes, utf8);
        } else {
            entry.file_name = String::from_utf8_lossy(name_bytes).into_owned();
            entry.comment = String::from_utf8_lossy(comment_bytes).into_owned();
        }

        Ok((entry, next))
    }

    /// Get the actual data offset for a file entry.
    ///
    /// The Local File Header (LFH) has variable-length fields (filename,
    /// extra field) that may differ from the Central Directory entry.
    /// This method reads the LFH to calculate where the actual file
    /// data begins.
    pub fn data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let lfh = self.slice(entry.lfh_offset, LFH_SIZE)?;

        // Verify LFH signature (PK\x03\x04)
        if &lfh[0..4] != LFH_SIGNATURE {
            bail!(invalid(format!(
                "invalid local file header signature for {}",
                entry.file_name
            )));
        }

        // Read the variable field lengths from fixed positions in LFH
        let mut cursor = Cursor::new(lfh);
        cursor.set_position(26);

        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        // Data starts after: LFH (30 bytes) + filename + extra field
        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }

    /// Open a decompressing stream over an entry's payload.
    ///
    /// # Errors
    ///
    /// Fails for encrypted entries, unsupported compression methods, and
    /// payloads that do not fit in the buffer.
    pub fn open_read_stream(&self, entry: &ZipFileEntry) -> Result<EntryReader> {
        if self.closed {
            bail!(UnzipError::Closed);
        }
        if entry.is_encrypted() {
            bail!(UnzipError::Encrypted(entry.file_name.clone()));
        }
        if let CompressionMethod::Unknown(method) = entry.compression_method {
            bail!(UnzipError::UnsupportedCompression(method));
        }

        let start = self.data_offset(entry)?;
        let len = usize::try_from(entry.compressed_size)
            .map_err(|_| invalid(format!("{} is too large", entry.file_name)))?;
        // Bounds check; the reader keeps its own handle on the buffer.
        self.slice(start, len)?;

        trace!(
            name = %entry.file_name,
            method = entry.compression_method.as_u16(),
            compressed = entry.compressed_size,
            uncompressed = entry.uncompressed_size,
            "opening entry stream"
        );

        let payload = SharedSlice::new(self.data.clone(), start as usize, start as usize + len);
        Ok(EntryReader::new(
            entry,
            payload,
            self.options.validate_entry_sizes,
        ))
    }
}

/// Apply the extra fields this reader understands to `entry`.
///
/// Returns the Info-ZIP Unicode Path, when present and still matching the
/// stored name.
fn parse_extra_fields(
    entry: &mut ZipFileEntry,
    extra: &[u8],
    name_bytes: &[u8],
) -> Result<Option<String>> {
    let mut cursor = Cursor::new(extra);
    let mut unicode_name = None;

    while cursor.position() + 4 <= extra.len() as u64 {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()? as u64;
        let field_start = cursor.position();
        let field_end = field_start + field_size;
        if field_end > extra.len() as u64 {
            bail!(invalid(format!(
                "extra field {header_id:#06x} overruns the extra data"
            )));
        }
        let field = &extra[field_start as usize..field_end as usize];

        match header_id {
            EXTRA_ZIP64 => {
                // Fields are present only if the header field is 0xFFFFFFFF
                let mut zip64 = Cursor::new(field);
                if entry.uncompressed_size == 0xFFFFFFFF && field.len() as u64 >= zip64.position() + 8 {
                    entry.uncompressed_size = zip64.read_u64::<LittleEndian>()?;
                }
                if entry.compressed_size == 0xFFFFFFFF && field.len() as u64 >= zip64.position() + 8 {
                    entry.compressed_size = zip64.read_u64::<LittleEndian>()?;
                }
                if entry.lfh_offset == 0xFFFFFFFF && field.len() as u64 >= zip64.position() + 8 {
                    entry.lfh_offset = zip64.read_u64::<LittleEndian>()?;
                }
            }
            EXTRA_EXTENDED_TIMESTAMP => {
                // flags(1), then mtime(4) when bit 0 is set
                if field.len() >= 5 && field[0] & 0x01 != 0 {
                    let mtime = i32::from_le_bytes([field[1], field[2], field[3], field[4]]);
                    entry.extended_mtime = Some(mtime as i64);
                }
            }
            EXTRA_UNICODE_PATH => {
                // version(1) = 1, crc32 of the stored name(4), UTF-8 name
                if field.len() >= 5 && field[0] == 1 {
                    let name_crc = u32::from_le_bytes([field[1], field[2], field[3], field[4]]);
                    if name_crc == crc32fast::hash(name_bytes) {
                        unicode_name = Some(String::from_utf8_lossy(&field[5..]).into_owned());
                    }
                }
            }
            _ => {}
        }

        cursor.set_position(field_end);
    }

    Ok(unicode_name)
}

#[async_trait]
impl EntrySource for ZipArchive {
    async fn next_entry(&mut self) -> Result<Option<ZipFileEntry>> {
        self.read_entry()
    }

    async fn open_read_stream(&mut self, entry: &ZipFileEntry) -> Result<Option<EntryReader>> {
        ZipArchive::open_read_stream(self, entry).map(Some)
    }

    fn close(&mut self) {
        ZipArchive::close(self)
    }
}
