//! Entry type and permission detection.
//!
//! Archives written on POSIX systems keep the full `st_mode` in the high 16
//! bits of the external attributes. Archives written by DOS-family tools only
//! set the low DOS attribute byte, where `0x10` marks a directory.

use std::fmt;

/// File type mask and type patterns of a POSIX mode word
const S_IFMT: u32 = 0xF000;
const S_IFDIR: u32 = 0x4000;
const S_IFLNK: u32 = 0xA000;

/// External attributes of a bare DOS directory entry
const MSDOS_DIR: u32 = 0x10;

/// `version made by` host id of MS-DOS and OS/2 FAT
const HOST_MSDOS: u16 = 0;

pub const DEFAULT_DIR_MODE: u32 = 0o755;
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Kind of an archive entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::File => "file",
            FileKind::Directory => "directory",
            FileKind::Symlink => "symlink",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide an entry's kind and mode from its raw attributes.
///
/// The returned mode is the raw POSIX mode word, type bits included, or the
/// default permissions for the kind when the archive stored none.
pub fn classify(external_attrs: u32, version_made_by: u16) -> (FileKind, u32) {
    let mode = external_attrs >> 16;
    let host = version_made_by >> 8;

    let kind = if mode & S_IFMT == S_IFLNK {
        FileKind::Symlink
    } else if mode & S_IFMT == S_IFDIR || (host == HOST_MSDOS && external_attrs == MSDOS_DIR) {
        FileKind::Directory
    } else {
        FileKind::File
    };

    let mode = match (mode, kind) {
        (0, FileKind::Directory) => DEFAULT_DIR_MODE,
        (0, _) => DEFAULT_FILE_MODE,
        (mode, _) => mode,
    };

    (kind, mode)
}
