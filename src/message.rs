//! Message codecs - turn application messages into frame bodies and back.
//!
//! The framing layer never interprets a body. A [`MessageCodec`] owns the
//! body format:
//!
//! - [`JsonCodec`] - any serde type as JSON (the default for [`Message`](crate::Message))
//! - [`RawCodec`] - bodies passed through untouched

use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StreamError};

/// Serializes application messages to opaque frame bodies.
pub trait MessageCodec: Send + Sync + 'static {
    type Message: Send + 'static;

    fn serialize(&self, message: &Self::Message) -> Result<Bytes>;

    /// Fails with [`StreamError::SchemaViolation`] when `body` is not a valid
    /// message.
    fn deserialize(&self, body: Bytes) -> Result<Self::Message>;
}

/// JSON body format via `serde_json`.
pub struct JsonCodec<M> {
    _message: PhantomData<fn() -> M>,
}

impl<M> JsonCodec<M> {
    pub fn new() -> Self {
        Self {
            _message: PhantomData,
        }
    }
}

impl<M> Default for JsonCodec<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for JsonCodec<M> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for JsonCodec<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCodec").finish()
    }
}

impl<M> MessageCodec for JsonCodec<M>
where
    M: Serialize + DeserializeOwned + Send + 'static,
{
    type Message = M;

    fn serialize(&self, message: &M) -> Result<Bytes> {
        serde_json::to_vec(message)
            .map(Bytes::from)
            .map_err(|e| StreamError::SchemaViolation(e.to_string()))
    }

    fn deserialize(&self, body: Bytes) -> Result<M> {
        serde_json::from_slice(&body).map_err(|e| StreamError::SchemaViolation(e.to_string()))
    }
}

/// Pass-through codec; messages are the frame bodies themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl MessageCodec for RawCodec {
    type Message = Bytes;

    fn serialize(&self, message: &Bytes) -> Result<Bytes> {
        Ok(message.clone())
    }

    fn deserialize(&self, body: Bytes) -> Result<Bytes> {
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Command, Message};

    #[test]
    fn json_message_roundtrip() {
        let codec = JsonCodec::<Message>::new();
        let msg = Message::velocity(888);

        let body = codec.serialize(&msg).unwrap();
        assert_eq!(&body[..], br#"{"command":"VELOCITY","data":888}"#);
        assert_eq!(codec.deserialize(body).unwrap(), msg);
    }

    #[test]
    fn malformed_json_is_schema_violation() {
        let codec = JsonCodec::<Message>::new();
        let err = codec
            .deserialize(Bytes::from_static(b"{\"command\":\"WARP\",\"data\":1}"))
            .unwrap_err();
        assert!(matches!(err, StreamError::SchemaViolation(_)));
        assert!(!err.is_terminal());
    }

    #[test]
    fn end_marker_survives_codec() {
        let codec = JsonCodec::<Message>::new();
        let body = codec.serialize(&Message::end()).unwrap();
        let decoded = codec.deserialize(body).unwrap();
        assert!(decoded.is_end());
        assert_eq!(decoded.command, Command::End);
    }

    #[test]
    fn raw_codec_passes_bytes_through() {
        let body = Bytes::from_static(b"\x00\x01opaque");
        assert_eq!(RawCodec.serialize(&body).unwrap(), body);
        assert_eq!(RawCodec.deserialize(body.clone()).unwrap(), body);
    }
}
