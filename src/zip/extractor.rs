use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::io::drain;
use crate::sink::FileSink;
use anyhow::Result;

use super::EntrySource;
use super::classify::{FileKind, classify};
use super::structures::ZipFileEntry;

/// One extracted archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    /// Stored entry name; directories keep their trailing `/`
    pub path: String,
    pub kind: FileKind,
    /// POSIX mode word as stored, or the kind's default when none was
    pub mode: u32,
    pub mtime: NaiveDateTime,
    /// Symlink target, only for symlinks
    pub linkname: Option<String>,
    /// Buffered payload, only for files extracted without a sink
    pub data: Option<Vec<u8>>,
}

/// Where file payloads go during a walk.
pub enum Extraction<'a> {
    /// Payloads are read into [`ExtractedFile::data`]
    Buffered,
    /// Payloads are handed to the sink as live streams
    Streamed(&'a mut dyn FileSink),
}

/// Extract a single entry.
///
/// On failure the source is closed before the error is returned.
pub async fn extract_entry<S: EntrySource + ?Sized>(
    entry: &ZipFileEntry,
    source: &mut S,
    extraction: &mut Extraction<'_>,
) -> Result<ExtractedFile> {
    let (kind, mode) = classify(entry.external_attrs, entry.version_made_by);
    let mut file = ExtractedFile {
        path: entry.file_name.clone(),
        kind,
        mode,
        mtime: entry.last_modified(),
        linkname: None,
        data: None,
    };

    match fill_payload(&mut file, entry, source, extraction).await {
        Ok(()) => Ok(file),
        Err(err) => {
            warn!(path = %file.path, error = %err, "extraction aborted");
            source.close();
            Err(err)
        }
    }
}

async fn fill_payload<S: EntrySource + ?Sized>(
    file: &mut ExtractedFile,
    entry: &ZipFileEntry,
    source: &mut S,
    extraction: &mut Extraction<'_>,
) -> Result<()> {
    let Some(mut stream) = source.open_read_stream(entry).await? else {
        return Ok(());
    };

    if file.kind == FileKind::Symlink {
        let target = drain(&mut stream).await?;
        file.linkname = Some(String::from_utf8_lossy(&target).into_owned());
    }

    match extraction {
        Extraction::Streamed(sink) => {
            // The stream is only handed over for regular files
            let stream = (file.kind == FileKind::File).then_some(stream);
            sink.write(file, stream).await
        }
        Extraction::Buffered if file.kind == FileKind::File => {
            file.data = Some(drain(&mut stream).await?);
            Ok(())
        }
        Extraction::Buffered => Ok(()),
    }
}

/// Extract every entry of `source`, in order.
///
/// Entries are pulled one at a time; the next one is only requested once the
/// previous extraction has finished. The first failure stops the walk and is
/// returned as-is, with the source closed.
pub async fn walk_all<S: EntrySource + ?Sized>(
    source: &mut S,
    mut extraction: Extraction<'_>,
) -> Result<Vec<ExtractedFile>> {
    let mut files = Vec::new();

    loop {
        let entry = match source.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, extracted = files.len(), "reading entry failed");
                source.close();
                return Err(err);
            }
        };

        let file = extract_entry(&entry, source, &mut extraction).await?;
        debug!(
            path = %file.path,
            kind = %file.kind,
            mode = %format!("{:o}", file.mode),
            "extracted entry"
        );
        files.push(file);
    }

    Ok(files)
}
