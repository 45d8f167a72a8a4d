//! Owned, non-seekable archive body handed from the fetcher to the extractor.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::TryStreamExt;
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::io::StreamReader;

use crate::plugins::PluginError;

/// Transport failure raised while the archive body was still being read.
///
/// Travels inside an [`io::Error`] through the decoder so the extractor can
/// report it as a network failure rather than a corrupt entry.
#[derive(Debug, thiserror::Error)]
#[error("archive transfer interrupted: {0}")]
pub(crate) struct TransferInterrupted(#[source] pub(crate) reqwest::Error);

pub struct ArchiveStream {
    reader: Pin<Box<dyn AsyncRead + Send>>,
    content_length: Option<u64>,
}

impl ArchiveStream {
    pub fn new(reader: impl AsyncRead + Send + 'static) -> Self {
        Self {
            reader: Box::pin(reader),
            content_length: None,
        }
    }

    /// Streams the response body; nothing is buffered beyond the current chunk.
    pub fn from_response(response: reqwest::Response) -> Self {
        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map_err(|e| io::Error::other(TransferInterrupted(e)));
        Self {
            reader: Box::pin(StreamReader::new(body)),
            content_length,
        }
    }

    pub fn from_bytes(data: impl Into<bytes::Bytes>) -> Self {
        let data: bytes::Bytes = data.into();
        let len = data.len() as u64;
        Self {
            reader: Box::pin(io::Cursor::new(data)),
            content_length: Some(len),
        }
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }
}

impl AsyncRead for ArchiveStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.reader.as_mut().poll_read(cx, buf)
    }
}

impl std::fmt::Debug for ArchiveStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Recovers a transport failure hidden inside a read error, if there is one.
pub(crate) fn take_transfer_error(err: io::Error) -> Result<PluginError, io::Error> {
    let is_transfer = err
        .get_ref()
        .is_some_and(|inner| inner.is::<TransferInterrupted>());
    if !is_transfer {
        return Err(err);
    }
    match err.into_inner().map(|inner| inner.downcast::<TransferInterrupted>()) {
        Some(Ok(interrupted)) => Ok(PluginError::Network(interrupted.0)),
        Some(Err(other)) => Err(io::Error::other(other)),
        None => Err(io::Error::other("archive transfer interrupted")),
    }
}
