use anyhow::Result;
use async_trait::async_trait;

use crate::zip::{EntryReader, ExtractedFile};

/// Receives extracted entries instead of having their payloads buffered.
///
/// `write` is called once per entry, in archive order, and extraction waits
/// for it before moving to the next entry. Regular files come with their live
/// payload stream; directories and symlinks come with `None`. A symlink's
/// target has already been read into [`ExtractedFile::linkname`] by then.
///
/// An error returned here aborts the whole extraction and is handed back to
/// the caller unchanged.
///
/// ```
/// use anyhow::Result;
/// use async_trait::async_trait;
/// use decompress_unzip::{EntryReader, ExtractedFile, FileSink};
///
/// struct Counter(usize);
///
/// #[async_trait]
/// impl FileSink for Counter {
///     async fn write(&mut self, _file: &ExtractedFile, stream: Option<EntryReader>) -> Result<()> {
///         if let Some(mut stream) = stream {
///             self.0 += tokio::io::copy(&mut stream, &mut tokio::io::sink()).await? as usize;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait FileSink: Send {
    async fn write(&mut self, file: &ExtractedFile, stream: Option<EntryReader>) -> Result<()>;
}
