//! ZIP archive parsing and extraction.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Lazy parsing of ZIP structures from an in-memory buffer
//! - [`stream`]: Decompressing, validating per-entry read streams
//! - [`classify`]: Entry kind and permission detection
//! - [`extractor`]: Per-entry extraction and the archive walk
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! The EOCD is read when an archive is opened; Central Directory headers are
//! then decoded one per [`EntrySource::next_entry`] call.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions for files > 4GB
//! - STORED (no compression) method
//! - DEFLATE compression method
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

pub mod classify;
mod extractor;
mod names;
mod parser;
mod stream;
mod structures;

pub use classify::{FileKind, classify};
pub use extractor::{ExtractedFile, Extraction, extract_entry, walk_all};
pub use parser::{ReaderOptions, ZipArchive};
pub use stream::EntryReader;
pub use structures::*;

use anyhow::Result;
use async_trait::async_trait;

/// Lazily iterated archive, as consumed by [`walk_all`].
#[async_trait]
pub trait EntrySource: Send {
    /// Parse the next directory entry; `None` once every entry has been read
    async fn next_entry(&mut self) -> Result<Option<ZipFileEntry>>;

    /// Open a decompressing stream over an entry's payload.
    ///
    /// `None` means the entry has no stream, which is not an error.
    async fn open_read_stream(&mut self, entry: &ZipFileEntry) -> Result<Option<EntryReader>>;

    /// Release the archive after a failure
    fn close(&mut self);
}
