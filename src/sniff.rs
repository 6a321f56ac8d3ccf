//! Container format detection from magic bytes.
//!
//! Only the leading bytes of a buffer are inspected. The table covers the
//! archive formats an unpacker is usually probed against, plus a few common
//! payload formats so callers can classify extracted data too.

/// Detected container or payload format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Zip,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
    SevenZip,
    Rar,
    Tar,
    Jpeg,
    Png,
    Gif,
    Pdf,
}

impl FileType {
    /// Conventional file extension for the format.
    pub fn ext(&self) -> &'static str {
        match self {
            FileType::Zip => "zip",
            FileType::Gzip => "gz",
            FileType::Bzip2 => "bz2",
            FileType::Xz => "xz",
            FileType::Zstd => "zst",
            FileType::SevenZip => "7z",
            FileType::Rar => "rar",
            FileType::Tar => "tar",
            FileType::Jpeg => "jpg",
            FileType::Png => "png",
            FileType::Gif => "gif",
            FileType::Pdf => "pdf",
        }
    }
}

const MAGIC: &[(&[u8], FileType)] = &[
    // Local file header, empty archive, spanned archive marker
    (b"PK\x03\x04", FileType::Zip),
    (b"PK\x05\x06", FileType::Zip),
    (b"PK\x07\x08", FileType::Zip),
    (b"\x1f\x8b\x08", FileType::Gzip),
    (b"BZh", FileType::Bzip2),
    (b"\xfd7zXZ\x00", FileType::Xz),
    (b"\x28\xb5\x2f\xfd", FileType::Zstd),
    (b"7z\xbc\xaf\x27\x1c", FileType::SevenZip),
    (b"Rar!\x1a\x07", FileType::Rar),
    (b"\xff\xd8\xff", FileType::Jpeg),
    (b"\x89PNG\r\n\x1a\n", FileType::Png),
    (b"GIF87a", FileType::Gif),
    (b"GIF89a", FileType::Gif),
    (b"%PDF-", FileType::Pdf),
];

/// ustar magic lives at offset 257 of the first header block.
const TAR_MAGIC_OFFSET: usize = 257;

/// Detect the format of `buf` from its leading bytes.
pub fn detect(buf: &[u8]) -> Option<FileType> {
    if let Some((_, ty)) = MAGIC.iter().find(|(magic, _)| buf.starts_with(magic)) {
        return Some(*ty);
    }

    let tar_magic = buf.get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5);
    if tar_magic == Some(b"ustar".as_slice()) {
        return Some(FileType::Tar);
    }

    None
}

/// True when `buf` starts like a ZIP archive.
pub fn is_zip(buf: &[u8]) -> bool {
    detect(buf) == Some(FileType::Zip)
}
