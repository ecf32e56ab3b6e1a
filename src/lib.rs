//! # varframe
//!
//! Varint length-prefixed message framing over a single persistent byte
//! stream, plus a client session that runs an inbound and an outbound loop
//! over one connection.
//!
//! ## Quick Start
//!
//! ```rust
//! use bytes::BytesMut;
//! use varframe::{encode_frame, try_decode_frame};
//!
//! let encoded = encode_frame(b"Hello, varframe!")?;
//! assert_eq!(encoded[0], 16); // body length prefix
//!
//! let mut buf = BytesMut::from(&encoded[..]);
//! let body = try_decode_frame(&mut buf, 1024)?.unwrap();
//! assert_eq!(&body[..], b"Hello, varframe!");
//! # Ok::<(), varframe::StreamError>(())
//! ```
//!
//! ## Wire Format
//!
//! ```text
//! Frame        := VarintLength Body
//! VarintLength := 1..5 bytes, little-endian base-128 groups, high bit = continuation
//! Body         := exactly VarintLength bytes
//! ```
//!
//! - The length counts body bytes only, never the prefix itself.
//! - The shortest encoding is always written; prefixes longer than five bytes
//!   are rejected.
//! - There is no magic number, version byte or checksum. Integrity comes from
//!   the transport and from the message codec's own validation.
//!
//! ## Layers
//!
//! | Layer | Type |
//! |-------|------|
//! | Length prefix | [`varint`] |
//! | Frames on a buffer | [`encode_frame`], [`try_decode_frame`] |
//! | Frames on a stream | [`FrameReader`], [`FrameWriter`], [`VarintFrameCodec`] |
//! | Message bodies | [`MessageCodec`], [`JsonCodec`], [`RawCodec`] |
//! | Connection | [`ClientSession`], [`tcp::TcpClient`] |

pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod message;
pub mod reader;
pub mod session;
pub mod tcp;
pub mod types;
pub mod varint;
pub mod writer;

// Re-export main types for convenience
pub use types::{
    Command, Message, SessionId, SessionState, DEFAULT_MAX_FRAME_SIZE, MAX_VARINT_LEN,
};

pub use codec::VarintFrameCodec;
pub use config::{SchemaPolicy, SessionConfig, TcpConfig};
pub use error::{Result, StreamError};
pub use frame::{encode_frame, put_frame, try_decode_frame};
pub use message::{JsonCodec, MessageCodec, RawCodec};
pub use reader::FrameReader;
pub use session::ClientSession;
pub use writer::FrameWriter;
