use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use decompress_unzip::{ExtractOptions, Input, UnzipError, decompress, decompress_value};
use rstest::rstest;
use tokio::io::{AsyncRead, ReadBuf};

/// Stream that fails on the first read.
struct BrokenPipe;

impl AsyncRead for BrokenPipe {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::other("pipe broke")))
    }
}

#[tokio::test]
async fn non_zip_input_yields_nothing() {
    let source = include_bytes!("main.rs");
    let files = decompress(source, ExtractOptions::default()).await.unwrap();
    assert!(files.is_empty());
}

#[rstest]
#[case::truncated(b"PK\x03\x04 this is not really a zip".to_vec())]
#[case::empty_input(Vec::new())]
#[case::empty_archive({
    let mut eocd = b"PK\x05\x06".to_vec();
    eocd.extend_from_slice(&[0u8; 18]);
    eocd
})]
#[tokio::test]
async fn unusable_archives_yield_nothing(#[case] input: Vec<u8>) {
    let files = decompress(input, ExtractOptions::default()).await.unwrap();
    assert!(files.is_empty());
}

#[tokio::test]
async fn throw_on_wrong_input() {
    let err = decompress_value("foo", ExtractOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Expected a Buffer or Stream, got &str");
    assert!(matches!(
        err.downcast_ref::<UnzipError>(),
        Some(UnzipError::InvalidInput { .. })
    ));
}

#[tokio::test]
async fn dynamic_buffer_input_is_accepted() {
    let files = decompress_value(crate::fixture("file.zip"), ExtractOptions::default())
        .await
        .unwrap();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn failing_stream_rejects_the_call() {
    let err = decompress(Input::stream(BrokenPipe), ExtractOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "pipe broke");
    let io_err = err.downcast_ref::<io::Error>().unwrap();
    assert_eq!(io_err.kind(), io::ErrorKind::Other);
}

#[tokio::test]
async fn dynamic_byte_arrays_need_slicing() {
    let err = decompress_value(b"PK\x03\x04", ExtractOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Expected a Buffer or Stream, got &[u8; 4]");

    let files = decompress_value(b"PK\x03\x04".as_slice(), ExtractOptions::default())
        .await
        .unwrap();
    assert!(files.is_empty());
}
