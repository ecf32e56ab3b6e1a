//! Base-128 varint used for the frame length prefix.
//!
//! Each byte carries seven data bits, least-significant group first. The high
//! bit is set on every byte except the last. Only 32-bit values are
//! supported, so a prefix is between 1 and [`MAX_VARINT_LEN`] bytes long.

use bytes::BufMut;

use crate::error::{Result, StreamError};
use crate::types::MAX_VARINT_LEN;

const CONTINUATION: u8 = 0x80;
const DATA_MASK: u8 = 0x7F;

/// Encode `value` using the shortest possible varint.
///
/// Fails with [`StreamError::ValueOutOfRange`] for values wider than 32 bits.
pub fn encode(value: u64) -> Result<Vec<u8>> {
    let value = u32::try_from(value).map_err(|_| StreamError::ValueOutOfRange(value))?;
    let mut out = Vec::with_capacity(encoded_size(value));
    put_varint(value, &mut out);
    Ok(out)
}

/// Append the varint encoding of `value` to `dst`.
pub fn put_varint<B: BufMut>(mut value: u32, dst: &mut B) {
    while value >= u32::from(CONTINUATION) {
        dst.put_u8((value as u8 & DATA_MASK) | CONTINUATION);
        value >>= 7;
    }
    dst.put_u8(value as u8);
}

/// Decode one varint starting at `offset`.
///
/// Returns the value and the number of bytes it occupied.
/// [`StreamError::TruncatedVarint`] means the input ran out while the
/// continuation bit was still set; callers reading from a stream treat that as
/// "need more bytes".
pub fn decode(buf: &[u8], offset: usize) -> Result<(u32, usize)> {
    let input = buf.get(offset..).unwrap_or_default();
    let mut value: u32 = 0;

    for (i, &byte) in input.iter().take(MAX_VARINT_LEN).enumerate() {
        if i == MAX_VARINT_LEN - 1 && byte > 0x0F {
            // fifth group may only hold the top four bits
            return Err(StreamError::VarintOverflow);
        }
        value |= u32::from(byte & DATA_MASK) << (7 * i);
        if byte & CONTINUATION == 0 {
            return Ok((value, i + 1));
        }
    }

    Err(StreamError::TruncatedVarint)
}

/// Number of bytes [`encode`] produces for `value`, without allocating.
pub const fn encoded_size(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}
