use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::io::AsyncRead;
use tokio_stream::StreamExt;
use tokio_util::codec::FramedRead;

use crate::codec::VarintFrameCodec;
use crate::error::{Result, StreamError};

/// Default size of the receive buffer.
pub const DEFAULT_READ_CAPACITY: usize = 8 * 1024;

/// Reassembles frame bodies from a byte stream with no message boundaries.
///
/// A single transport read may carry part of a frame or several frames; the
/// reader buffers across reads and hands out exactly one body per call to
/// [`next_frame`](Self::next_frame). It is also a [`Stream`] of bodies.
pub struct FrameReader<R> {
    inner: FramedRead<R, VarintFrameCodec>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(io: R) -> Self {
        Self::with_codec(io, VarintFrameCodec::new(), DEFAULT_READ_CAPACITY)
    }

    /// Create a reader that rejects frames larger than `max_frame_size`.
    pub fn with_max_frame_size(io: R, max_frame_size: usize) -> Self {
        Self::with_codec(
            io,
            VarintFrameCodec::with_max_frame_size(max_frame_size),
            DEFAULT_READ_CAPACITY,
        )
    }

    pub fn with_codec(io: R, codec: VarintFrameCodec, capacity: usize) -> Self {
        Self {
            inner: FramedRead::with_capacity(io, codec, capacity),
        }
    }

    /// Wait for the next complete frame body.
    ///
    /// Returns `Ok(None)` once the peer has closed the stream cleanly on a
    /// frame boundary. A close in the middle of a frame is reported as
    /// [`StreamError::TruncatedVarint`] or [`StreamError::TransportClosed`].
    /// After any error the stream cannot be resynchronised.
    pub async fn next_frame(&mut self) -> Result<Option<Bytes>> {
        self.inner.try_next().await
    }

    /// Bytes received but not yet returned as part of a frame.
    pub fn buffered_len(&self) -> usize {
        self.inner.read_buffer().len()
    }

    pub fn get_ref(&self) -> &R {
        self.inner.get_ref()
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R: AsyncRead + Unpin> Stream for FrameReader<R> {
    type Item = std::result::Result<Bytes, StreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
