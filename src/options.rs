use std::fmt;

use crate::sink::FileSink;
use crate::zip::{Extraction, ReaderOptions};

/// Options for [`decompress`](crate::decompress).
///
/// ```
/// use decompress_unzip::ExtractOptions;
///
/// let options = ExtractOptions::new()
///     .strict_file_names(true)
///     .validate_entry_sizes(false);
/// assert!(options.sink.is_none());
/// ```
#[derive(Default)]
pub struct ExtractOptions {
    /// Destination for file payloads. Without one, payloads are buffered
    /// into [`ExtractedFile::data`](crate::ExtractedFile::data).
    pub sink: Option<Box<dyn FileSink>>,
    /// Archive parsing switches, also set through the builder methods below
    pub reader: ReaderOptions,
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink<S: FileSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Verify decompressed sizes and CRC-32 values (default: on)
    pub fn validate_entry_sizes(mut self, enabled: bool) -> Self {
        self.reader.validate_entry_sizes = enabled;
        self
    }

    /// Fail on backslashes in entry names instead of rewriting them (default: off)
    pub fn strict_file_names(mut self, enabled: bool) -> Self {
        self.reader.strict_file_names = enabled;
        self
    }

    /// Decode names as CP437/UTF-8 and validate them (default: on)
    pub fn decode_strings(mut self, enabled: bool) -> Self {
        self.reader.decode_strings = enabled;
        self
    }

    /// Prefer the UTC extended timestamp field over the DOS date/time (default: off)
    pub fn extended_timestamps(mut self, enabled: bool) -> Self {
        self.reader.extended_timestamps = enabled;
        self
    }

    pub(crate) fn extraction(&mut self) -> Extraction<'_> {
        match self.sink.as_deref_mut() {
            Some(sink) => Extraction::Streamed(sink),
            None => Extraction::Buffered,
        }
    }
}

impl fmt::Debug for ExtractOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractOptions")
            .field("sink", &self.sink.as_ref().map(|_| ".."))
            .field("reader", &self.reader)
            .finish()
    }
}
