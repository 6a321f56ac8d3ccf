//! Input normalization.
//!
//! Archives arrive either as a byte buffer or as an async byte stream. Both
//! end up as one contiguous buffer, because the central directory sits at the
//! end of a ZIP file and has to be randomly addressable.

use std::any::{Any, type_name};
use std::fmt;
use std::io;

use anyhow::Result;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::UnzipError;

/// Boxed async byte stream accepted as archive input.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// Archive input: a byte buffer or a readable stream.
pub enum Input {
    Buffer(Vec<u8>),
    Stream(ByteStream),
}

impl Input {
    /// Wrap any async reader as stream input.
    pub fn stream<R: AsyncRead + Send + Unpin + 'static>(reader: R) -> Self {
        Input::Stream(Box::new(reader))
    }

    /// Classify a dynamically typed value as archive input.
    ///
    /// Accepts `Vec<u8>`, `Box<[u8]>`, `&'static [u8]`, [`ByteStream`] and
    /// [`Input`] itself. Anything else fails with
    /// [`UnzipError::InvalidInput`] naming the value's type.
    ///
    /// Fixed-size arrays such as `&[u8; 4]` are rejected here, since `Any`
    /// cannot downcast over every length. Pass them as a slice, or go through
    /// [`decompress`](crate::decompress), which takes them via `From`.
    ///
    /// ```
    /// use decompress_unzip::Input;
    ///
    /// let err = Input::from_value("foo").unwrap_err();
    /// assert_eq!(err.to_string(), "Expected a Buffer or Stream, got &str");
    /// ```
    pub fn from_value<T: Any + Send>(value: T) -> Result<Self> {
        let value: Box<dyn Any + Send> = Box::new(value);

        let value = match value.downcast::<Input>() {
            Ok(input) => return Ok(*input),
            Err(other) => other,
        };
        let value = match value.downcast::<Vec<u8>>() {
            Ok(buf) => return Ok(Input::Buffer(*buf)),
            Err(other) => other,
        };
        let value = match value.downcast::<Box<[u8]>>() {
            Ok(buf) => return Ok(Input::Buffer(buf.into_vec())),
            Err(other) => other,
        };
        let value = match value.downcast::<&'static [u8]>() {
            Ok(buf) => return Ok(Input::Buffer(buf.to_vec())),
            Err(other) => other,
        };
        match value.downcast::<ByteStream>() {
            Ok(stream) => Ok(Input::Stream(*stream)),
            Err(_) => Err(UnzipError::InvalidInput {
                type_name: type_name::<T>(),
            }
            .into()),
        }
    }

    /// Resolve the input to a byte buffer, draining stream input to its end.
    pub async fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Input::Buffer(buf) => Ok(buf),
            Input::Stream(mut stream) => drain(&mut stream).await,
        }
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Buffer(buf) => f.debug_tuple("Buffer").field(&buf.len()).finish(),
            Input::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Vec<u8>> for Input {
    fn from(buf: Vec<u8>) -> Self {
        Input::Buffer(buf)
    }
}

impl From<&[u8]> for Input {
    fn from(buf: &[u8]) -> Self {
        Input::Buffer(buf.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Input {
    fn from(buf: &[u8; N]) -> Self {
        Input::Buffer(buf.to_vec())
    }
}

impl From<ByteStream> for Input {
    fn from(stream: ByteStream) -> Self {
        Input::Stream(stream)
    }
}

/// Read a stream to its end into memory.
///
/// Classified failures raised inside an entry stream come back out as
/// [`UnzipError`] rather than as an opaque I/O error.
pub async fn drain<R: AsyncRead + Unpin + ?Sized>(reader: &mut R) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .await
        .map_err(unwrap_io_error)?;
    Ok(buf)
}

fn unwrap_io_error(err: io::Error) -> anyhow::Error {
    match err.get_ref().and_then(|inner| inner.downcast_ref::<UnzipError>()) {
        Some(classified) => classified.clone().into(),
        None => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    struct Broken;

    impl AsyncRead for Broken {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::other("pipe broke")))
        }
    }

    #[tokio::test]
    async fn stream_input_is_drained() {
        let input = Input::stream(&b"PK\x03\x04rest"[..]);
        assert_eq!(input.into_bytes().await.unwrap(), b"PK\x03\x04rest");
    }

    #[test]
    fn from_value_accepts_buffers_and_streams() {
        assert!(matches!(
            Input::from_value(vec![1u8, 2, 3]).unwrap(),
            Input::Buffer(ref b) if b == &[1, 2, 3]
        ));
        let stream: ByteStream = Box::new(&b"abc"[..]);
        assert!(matches!(
            Input::from_value(stream).unwrap(),
            Input::Stream(_)
        ));
    }

    #[test]
    fn from_value_names_the_rejected_type() {
        let err = Input::from_value(String::from("foo")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<UnzipError>(),
            Some(&UnzipError::InvalidInput {
                type_name: "alloc::string::String"
            })
        );

        let err = Input::from_value(42u32).unwrap_err();
        assert_eq!(err.to_string(), "Expected a Buffer or Stream, got u32");
    }

    #[test]
    fn from_value_takes_arrays_only_as_slices() {
        assert!(Input::from_value(b"abc").is_err());
        assert!(matches!(
            Input::from_value(b"abc".as_slice()).unwrap(),
            Input::Buffer(ref b) if b == b"abc"
        ));
    }

    #[tokio::test]
    async fn drain_passes_plain_io_errors_through() {
        let mut reader = Broken;
        let err = drain(&mut reader).await.unwrap_err();
        assert_eq!(err.to_string(), "pipe broke");
        assert!(err.downcast_ref::<UnzipError>().is_none());
    }
}
