//! Buffer-level frame encoding and decoding.
//!
//! A frame on the wire is a varint body length followed by exactly that many
//! body bytes. There is no magic, version or checksum.

use bytes::{Buf, Bytes, BytesMut};
use tracing::debug;

use crate::error::{Result, StreamError};
use crate::varint;

/// Encode `body` as a complete length-prefixed frame.
pub fn encode_frame(body: &[u8]) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    put_frame(body, &mut dst)?;
    Ok(dst.freeze())
}

/// Append the frame for `body` to `dst`, prefix and body in one contiguous run.
pub fn put_frame(body: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(body.len())
        .map_err(|_| StreamError::ValueOutOfRange(body.len() as u64))?;

    dst.reserve(varint::encoded_size(len) + body.len());
    varint::put_varint(len, dst);
    dst.extend_from_slice(body);
    Ok(())
}

/// Try to extract one frame body from the front of `buf`.
///
/// Returns `Ok(None)` when the prefix or body is still incomplete; the bytes
/// stay in `buf` untouched. On success the prefix and body are consumed.
/// A declared length above `max_frame_size` is rejected before any space is
/// reserved for it.
pub fn try_decode_frame(buf: &mut BytesMut, max_frame_size: usize) -> Result<Option<Bytes>> {
    let (len, prefix_len) = match varint::decode(&buf[..], 0) {
        Ok(decoded) => decoded,
        Err(StreamError::TruncatedVarint) => return Ok(None),
        Err(e) => return Err(e),
    };

    let len = len as usize;
    if len > max_frame_size {
        debug!("rejecting frame of {} bytes (max {})", len, max_frame_size);
        return Err(StreamError::frame_too_large(len, max_frame_size));
    }

    let total = prefix_len + len;
    if buf.len() < total {
        buf.reserve(total - buf.len());
        return Ok(None);
    }

    buf.advance(prefix_len);
    Ok(Some(buf.split_to(len).freeze()))
}
