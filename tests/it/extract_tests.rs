use decompress_unzip::sniff::{self, FileType};
use decompress_unzip::{ExtractOptions, FileKind, Input, UnzipError, decompress};

use crate::{fixture, fixture_path};

#[tokio::test]
async fn extract_file() {
    let files = decompress(fixture("file.zip"), ExtractOptions::default())
        .await
        .unwrap();

    assert_eq!(files.len(), 1);
    let file = &files[0];
    assert_eq!(file.path, "test.jpg");
    assert_eq!(file.kind, FileKind::File);
    assert_eq!(file.mode, 0o100644);
    assert_eq!(file.mtime.to_string(), "2020-01-02 03:04:06");
    assert_eq!(file.linkname, None);

    let data = file.data.as_deref().unwrap();
    assert_eq!(sniff::detect(data), Some(FileType::Jpeg));
}

#[tokio::test]
async fn extract_file_using_streams() {
    let buffered = decompress(fixture("file.zip"), ExtractOptions::default())
        .await
        .unwrap();

    let stream = tokio::fs::File::open(fixture_path("file.zip")).await.unwrap();
    let streamed = decompress(Input::stream(stream), ExtractOptions::default())
        .await
        .unwrap();

    assert_eq!(streamed, buffered);
}

#[tokio::test]
async fn extract_multiple_files() {
    let files = decompress(fixture("multiple.zip"), ExtractOptions::default())
        .await
        .unwrap();

    let listing: Vec<_> = files.iter().map(|f| (f.path.as_str(), f.kind)).collect();
    assert_eq!(
        listing,
        [
            ("0.txt", FileKind::File),
            ("1/", FileKind::Directory),
            ("1/2.txt", FileKind::File),
            ("3/4/", FileKind::Directory),
        ]
    );

    assert_eq!(files[0].data.as_deref(), Some(&b"1"[..]));
    assert_eq!(files[2].data.as_deref(), Some(&[b'2'; 100][..]));
    assert_eq!(files[3].data, None);
    assert_eq!(files[3].mode, 0o040755);
}

#[tokio::test]
async fn extract_symlinks() {
    let files = decompress(fixture("symlink.zip"), ExtractOptions::default())
        .await
        .unwrap();

    assert_eq!(files[0].path, "ReactiveCocoa");
    assert_eq!(files[0].kind, FileKind::Symlink);
    assert_eq!(
        files[0].linkname.as_deref(),
        Some("Versions/Current/ReactiveCocoa")
    );
    assert_eq!(files[0].data, None);

    assert_eq!(files[1].kind, FileKind::File);
    assert_eq!(files[1].data.as_deref(), Some(&b"binary"[..]));
}

#[tokio::test]
async fn dos_made_entries_get_default_modes() {
    let files = decompress(fixture("legacy.zip"), ExtractOptions::default())
        .await
        .unwrap();

    assert_eq!(files[0].path, "docs/");
    assert_eq!(files[0].kind, FileKind::Directory);
    assert_eq!(files[0].mode, 0o755);

    assert_eq!(files[1].path, "docs/readme.txt");
    assert_eq!(files[1].kind, FileKind::File);
    assert_eq!(files[1].mode, 0o644);
    assert_eq!(files[1].data.as_deref(), Some(&b"hello from dos"[..]));
}

#[tokio::test]
async fn corrupt_entry_aborts_extraction() {
    let err = decompress(fixture("corrupt.zip"), ExtractOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<UnzipError>(),
        Some(UnzipError::CrcMismatch { name, .. }) if name == "a.txt"
    ));
}

#[tokio::test]
async fn corrupt_entry_passes_without_validation() {
    let options = ExtractOptions::new().validate_entry_sizes(false);
    let files = decompress(fixture("corrupt.zip"), options).await.unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].data.as_deref(), Some(&b"First entry"[..]));
    assert_eq!(files[1].data.as_deref(), Some(&b"second entry"[..]));
}
