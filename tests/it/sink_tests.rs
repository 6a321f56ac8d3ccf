use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use async_trait::async_trait;
use decompress_unzip::io::drain;
use decompress_unzip::{EntryReader, ExtractOptions, ExtractedFile, FileSink, decompress};

use crate::fixture;

#[derive(Debug, Clone, PartialEq)]
struct Call {
    path: String,
    payload: Option<Vec<u8>>,
}

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileSink for Recorder {
    async fn write(&mut self, file: &ExtractedFile, stream: Option<EntryReader>) -> Result<()> {
        let payload = match stream {
            Some(mut stream) => Some(drain(&mut stream).await?),
            None => None,
        };
        self.calls.lock().unwrap().push(Call {
            path: file.path.clone(),
            payload,
        });
        Ok(())
    }
}

struct Failing;

#[async_trait]
impl FileSink for Failing {
    async fn write(&mut self, _file: &ExtractedFile, _stream: Option<EntryReader>) -> Result<()> {
        bail!("Test throw")
    }
}

#[tokio::test]
async fn extract_file_to_sink() {
    let recorder = Recorder::default();
    let options = ExtractOptions::new().with_sink(recorder.clone());
    let files = decompress(fixture("file.zip"), options).await.unwrap();

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, "test.jpg");
    assert_eq!(files[0].data, None);

    let calls = recorder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, "test.jpg");
    let payload = calls[0].payload.as_deref().unwrap();
    assert!(payload.starts_with(b"\xff\xd8\xff"));
}

#[tokio::test]
async fn directories_reach_the_sink_without_a_stream() {
    let recorder = Recorder::default();
    let options = ExtractOptions::new().with_sink(recorder.clone());
    let files = decompress(fixture("multiple.zip"), options).await.unwrap();

    assert_eq!(files.len(), 4);
    assert!(files.iter().all(|f| f.data.is_none()));

    let calls = recorder.calls();
    let seen: Vec<_> = calls
        .iter()
        .map(|c| (c.path.as_str(), c.payload.is_some()))
        .collect();
    assert_eq!(
        seen,
        [("0.txt", true), ("1/", false), ("1/2.txt", true), ("3/4/", false)]
    );
}

#[tokio::test]
async fn symlinks_reach_the_sink_without_a_stream() {
    let recorder = Recorder::default();
    let options = ExtractOptions::new().with_sink(recorder.clone());
    let files = decompress(fixture("symlink.zip"), options).await.unwrap();

    assert_eq!(
        files[0].linkname.as_deref(),
        Some("Versions/Current/ReactiveCocoa")
    );
    let calls = recorder.calls();
    assert_eq!(
        calls[0],
        Call {
            path: "ReactiveCocoa".into(),
            payload: None,
        }
    );
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].path, "Versions/Current/ReactiveCocoa");
    assert!(calls[1].payload.is_some());
}

#[tokio::test]
async fn throw_once_sink_throws() {
    let options = ExtractOptions::new().with_sink(Failing);
    let err = decompress(fixture("file.zip"), options).await.unwrap_err();
    assert_eq!(err.to_string(), "Test throw");
}
