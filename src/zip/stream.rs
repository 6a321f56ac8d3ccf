//! Per-entry decompressing read stream.

use std::fmt;
use std::io::{self, Cursor, Read};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use flate2::read::DeflateDecoder;
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::UnzipError;

use super::structures::{CompressionMethod, ZipFileEntry};

/// A window into the shared archive buffer.
///
/// Readers own one of these instead of borrowing the archive, so a stream
/// handed to a sink stays valid however long the sink keeps it.
#[derive(Clone)]
pub struct SharedSlice {
    data: Arc<[u8]>,
    start: usize,
    end: usize,
}

impl SharedSlice {
    pub fn new(data: Arc<[u8]>, start: usize, end: usize) -> Self {
        debug_assert!(start <= end && end <= data.len());
        Self { data, start, end }
    }
}

impl AsRef<[u8]> for SharedSlice {
    fn as_ref(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }
}

/// Decompressing stream over one entry's payload.
///
/// The source is already in memory, so every poll completes immediately.
/// When size validation is on, the stream fails as soon as it produces more
/// bytes than declared, and at end of data if the byte count or the CRC-32
/// differs from the central directory.
pub struct EntryReader {
    name: String,
    inner: Box<dyn Read + Send>,
    hasher: crc32fast::Hasher,
    produced: u64,
    expected_size: u64,
    expected_crc: u32,
    validate: bool,
    finished: bool,
}

impl EntryReader {
    pub(crate) fn new(entry: &ZipFileEntry, payload: SharedSlice, validate: bool) -> Self {
        let source = Cursor::new(payload);
        let inner: Box<dyn Read + Send> = match entry.compression_method {
            CompressionMethod::Deflate => Box::new(DeflateDecoder::new(source)),
            _ => Box::new(source),
        };

        Self {
            name: entry.file_name.clone(),
            inner,
            hasher: crc32fast::Hasher::new(),
            produced: 0,
            expected_size: entry.uncompressed_size,
            expected_crc: entry.crc32,
            validate,
            finished: false,
        }
    }

    /// Name of the entry this stream belongs to
    pub fn name(&self) -> &str {
        &self.name
    }

    fn size_mismatch(&self) -> io::Error {
        invalid_data(UnzipError::SizeMismatch {
            name: self.name.clone(),
            expected: self.expected_size,
            actual: self.produced,
        })
    }

    fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        if !self.validate {
            return Ok(());
        }

        if self.produced != self.expected_size {
            return Err(self.size_mismatch());
        }

        let actual = std::mem::take(&mut self.hasher).finalize();
        if actual != self.expected_crc {
            return Err(invalid_data(UnzipError::CrcMismatch {
                name: self.name.clone(),
                expected: self.expected_crc,
                actual,
            }));
        }

        Ok(())
    }

    fn read_chunk(&mut self, buf: &mut ReadBuf<'_>) -> io::Result<()> {
        if self.finished || buf.remaining() == 0 {
            return Ok(());
        }

        let dst = buf.initialize_unfilled();
        let n = self.inner.read(dst)?;
        if n == 0 {
            return self.finish();
        }

        self.hasher.update(&dst[..n]);
        self.produced += n as u64;
        if self.validate && self.produced > self.expected_size {
            self.finished = true;
            return Err(self.size_mismatch());
        }

        buf.advance(n);
        Ok(())
    }
}

impl AsyncRead for EntryReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(self.get_mut().read_chunk(buf))
    }
}

impl fmt::Debug for EntryReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryReader")
            .field("name", &self.name)
            .field("produced", &self.produced)
            .field("expected_size", &self.expected_size)
            .finish_non_exhaustive()
    }
}

fn invalid_data(err: UnzipError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}
