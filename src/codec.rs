//! Tokio codec for varint length-prefixed frames.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::StreamError;
use crate::frame::{put_frame, try_decode_frame};
use crate::types::DEFAULT_MAX_FRAME_SIZE;
use crate::varint;

/// Frames message bodies with a varint length prefix.
///
/// The decoder's read buffer is the stream cursor: bytes that arrived from the
/// transport but do not yet form a complete frame stay in it between calls.
#[derive(Debug, Clone)]
pub struct VarintFrameCodec {
    max_frame_size: usize,
}

impl VarintFrameCodec {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a codec that rejects bodies larger than `max_frame_size`.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for VarintFrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for VarintFrameCodec {
    type Item = Bytes;
    type Error = StreamError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, StreamError> {
        try_decode_frame(src, self.max_frame_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, StreamError> {
        if let Some(body) = self.decode(src)? {
            return Ok(Some(body));
        }
        if src.is_empty() {
            return Ok(None);
        }

        // The peer closed with a partial frame buffered.
        match varint::decode(&src[..], 0) {
            Err(StreamError::TruncatedVarint) => Err(StreamError::TruncatedVarint),
            _ => Err(StreamError::TransportClosed),
        }
    }
}

impl Encoder<Bytes> for VarintFrameCodec {
    type Error = StreamError;

    fn encode(&mut self, body: Bytes, dst: &mut BytesMut) -> Result<(), StreamError> {
        if body.len() > self.max_frame_size {
            return Err(StreamError::frame_too_large(body.len(), self.max_frame_size));
        }
        put_frame(&body, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_frame_then_waits() {
        let mut codec = VarintFrameCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0xAC, 0x02]);
        buf.extend_from_slice(&[7u8; 300]);

        let body = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(body.len(), 300);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn eof_with_empty_buffer_is_clean() {
        let mut codec = VarintFrameCodec::new();
        let mut buf = BytesMut::new();
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn eof_mid_prefix_is_truncated() {
        let mut codec = VarintFrameCodec::new();
        let mut buf = BytesMut::from(&[0xAC][..]);
        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(StreamError::TruncatedVarint)
        ));
    }

    #[test]
    fn eof_mid_body_is_closed() {
        let mut codec = VarintFrameCodec::new();
        let mut buf = BytesMut::from(&[0x03, b'a'][..]);
        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(StreamError::TransportClosed)
        ));
    }

    #[test]
    fn encoder_enforces_max_frame_size() {
        let mut codec = VarintFrameCodec::with_max_frame_size(4);
        let mut dst = BytesMut::new();

        codec.encode(Bytes::from_static(b"abcd"), &mut dst).unwrap();
        assert_eq!(&dst[..], &[0x04, b'a', b'b', b'c', b'd']);

        let err = codec
            .encode(Bytes::from_static(b"abcde"), &mut dst)
            .unwrap_err();
        assert!(matches!(err, StreamError::FrameCorrupt(_)));
        assert_eq!(dst.len(), 5);
    }
}
