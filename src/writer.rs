use bytes::Bytes;
use futures::SinkExt;
use tokio::io::AsyncWrite;
use tokio_util::codec::FramedWrite;

use crate::codec::VarintFrameCodec;
use crate::error::Result;

/// Writes length-prefixed frames to a byte stream.
///
/// The prefix and body are encoded into one buffer and flushed together, so a
/// frame is never split into two independent transport writes. Short writes
/// are retried until the whole buffer is out or the transport fails.
///
/// A `FrameWriter` takes `&mut self` for every write, which keeps a single
/// writer per stream. Callers that need several producers should funnel them
/// through one writer (the session does this with a queue).
pub struct FrameWriter<W> {
    inner: FramedWrite<W, VarintFrameCodec>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(io: W) -> Self {
        Self::with_codec(io, VarintFrameCodec::new())
    }

    pub fn with_max_frame_size(io: W, max_frame_size: usize) -> Self {
        Self::with_codec(io, VarintFrameCodec::with_max_frame_size(max_frame_size))
    }

    pub fn with_codec(io: W, codec: VarintFrameCodec) -> Self {
        Self {
            inner: FramedWrite::new(io, codec),
        }
    }

    /// Frame `body` and write it out completely.
    pub async fn write_frame(&mut self, body: impl Into<Bytes>) -> Result<()> {
        self.inner.send(body.into()).await
    }

    /// Flush anything pending and shut down the write half of the transport.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.close().await
    }

    pub fn max_frame_size(&self) -> usize {
        self.inner.encoder().max_frame_size()
    }

    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamError;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn writes_prefix_and_body() {
        let body = vec![0x11u8; 300];
        let mut expected = vec![0xAC, 0x02];
        expected.extend_from_slice(&body);

        let mock = Builder::new().write(&expected).build();
        let mut writer = FrameWriter::new(mock);
        writer.write_frame(body).await.unwrap();
    }

    #[tokio::test]
    async fn empty_body_is_single_zero_byte() {
        let mock = Builder::new().write(&[0x00]).build();
        let mut writer = FrameWriter::new(mock);
        writer.write_frame(Bytes::new()).await.unwrap();
    }

    #[tokio::test]
    async fn consecutive_frames_keep_order() {
        let mock = Builder::new()
            .write(&[0x02, b'h', b'i'])
            .write(&[0x03, b'y', b'o', b'u'])
            .build();
        let mut writer = FrameWriter::new(mock);
        writer.write_frame(&b"hi"[..]).await.unwrap();
        writer.write_frame(&b"you"[..]).await.unwrap();
    }

    #[tokio::test]
    async fn broken_pipe_is_transport_closed() {
        let mock = Builder::new()
            .write_error(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
            .build();
        let mut writer = FrameWriter::new(mock);

        let err = writer.write_frame(&b"x"[..]).await.unwrap_err();
        assert!(matches!(err, StreamError::TransportClosed));
    }

    #[tokio::test]
    async fn oversized_body_is_not_written() {
        let mock = Builder::new().build();
        let mut writer = FrameWriter::with_max_frame_size(mock, 2);

        let err = writer.write_frame(&b"abc"[..]).await.unwrap_err();
        assert!(matches!(err, StreamError::FrameCorrupt(_)));
    }
}
