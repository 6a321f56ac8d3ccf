//! # decompress-unzip
//!
//! Extract ZIP archives held in memory, or arriving as an async byte stream,
//! into a list of in-memory file descriptors.
//!
//! Each [`ExtractedFile`] carries the entry's path, kind (file, directory or
//! symlink), POSIX mode, modification time, and either the buffered payload
//! or, when a [`FileSink`] is supplied, nothing: the payload stream goes to
//! the sink instead.
//!
//! ## Features
//!
//! - Buffer and stream input
//! - File, directory and symlink detection for both POSIX-made and DOS-made archives
//! - Lazy, strictly ordered, one-entry-at-a-time extraction
//! - STORED and DEFLATE entries, ZIP64, CRC-32 and size validation
//! - Non-ZIP input yields an empty list, so this can be one of several probed unpackers
//!
//! ## Example
//!
//! ```no_run
//! use decompress_unzip::{ExtractOptions, FileKind, decompress};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let buf = tokio::fs::read("archive.zip").await?;
//!     let files = decompress(buf, ExtractOptions::default()).await?;
//!
//!     for file in &files {
//!         match file.kind {
//!             FileKind::Symlink => println!("{} -> {}", file.path, file.linkname.as_deref().unwrap_or("")),
//!             _ => println!("{:o} {} {}", file.mode, file.mtime, file.path),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod io;
pub mod options;
pub mod sink;
pub mod sniff;
pub mod zip;

pub use error::UnzipError;
pub use io::{ByteStream, Input};
pub use options::ExtractOptions;
pub use sink::FileSink;
pub use zip::{EntryReader, ExtractedFile, FileKind, ZipArchive};

use std::any::Any;

use anyhow::Result;
use tracing::debug;

/// Extract every entry of a ZIP archive.
///
/// Stream input is drained into memory first. Input that does not sniff as
/// ZIP, or whose end records cannot be parsed, yields an empty list rather
/// than an error.
///
/// # Errors
///
/// Fails if the stream cannot be drained, if an entry cannot be parsed or
/// decompressed, or if the sink fails. The sink's error is returned as is.
pub async fn decompress(input: impl Into<Input>, mut options: ExtractOptions) -> Result<Vec<ExtractedFile>> {
    let buf = input.into().into_bytes().await?;

    if !sniff::is_zip(&buf) {
        debug!(len = buf.len(), kind = ?sniff::detect(&buf), "input is not a zip archive");
        return Ok(Vec::new());
    }

    let mut archive = match ZipArchive::open(buf, options.reader) {
        Ok(archive) => archive,
        Err(err) => {
            debug!(error = %err, "zip signature present but archive did not open");
            return Ok(Vec::new());
        }
    };

    zip::walk_all(&mut archive, options.extraction()).await
}

/// [`decompress`] for a dynamically typed input.
///
/// The value is classified with [`Input::from_value`]; anything that is not a
/// byte buffer or a [`ByteStream`] fails with [`UnzipError::InvalidInput`]
/// before any I/O happens.
pub async fn decompress_value<T: Any + Send>(
    input: T,
    options: ExtractOptions,
) -> Result<Vec<ExtractedFile>> {
    let input = Input::from_value(input)?;
    decompress(input, options).await
}
