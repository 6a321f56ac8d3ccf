use thiserror::Error;

/// Classified extraction failures.
///
/// Public functions return [`anyhow::Result`]; these variants travel inside the
/// `anyhow::Error` and can be recovered with `downcast_ref::<UnzipError>()`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnzipError {
    /// The caller handed over something that is neither a byte buffer nor a stream.
    #[error("Expected a Buffer or Stream, got {type_name}")]
    InvalidInput { type_name: &'static str },

    #[error("Invalid ZIP archive: {0}")]
    InvalidArchive(String),

    #[error("Unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    #[error("Entry is encrypted: {0}")]
    Encrypted(String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("Size mismatch for {name}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("CRC-32 mismatch for {name}: expected {expected:08x}, got {actual:08x}")]
    CrcMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("Archive is closed")]
    Closed,
}
