use std::io;

use thiserror::Error;

/// Errors produced by the framing layer and the client session.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A length does not fit the 32-bit varint prefix.
    #[error("value {0} exceeds the 32-bit varint range")]
    ValueOutOfRange(u64),

    /// Input ended while a varint still signalled continuation.
    #[error("truncated varint length prefix")]
    TruncatedVarint,

    /// More than five varint groups, or bits beyond 32.
    #[error("varint length prefix overflows 32 bits")]
    VarintOverflow,

    #[error("corrupt frame: {0}")]
    FrameCorrupt(String),

    #[error("transport error: {0}")]
    Transport(#[source] io::Error),

    #[error("transport closed")]
    TransportClosed,

    /// The message codec rejected a body.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StreamError {
    /// Whether the session must be torn down after this error.
    ///
    /// A schema violation leaves frame boundaries intact, so it is the only
    /// recoverable kind.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamError::SchemaViolation(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, StreamError::TransportClosed)
    }

    pub(crate) fn frame_too_large(len: usize, max: usize) -> Self {
        StreamError::FrameCorrupt(format!(
            "declared length {} exceeds maximum frame size {}",
            len, max
        ))
    }
}

impl From<io::Error> for StreamError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof => StreamError::TransportClosed,
            _ => StreamError::Transport(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_kinds_map_to_transport_closed() {
        let err: StreamError = io::Error::from(io::ErrorKind::BrokenPipe).into();
        assert!(err.is_closed());

        let err: StreamError = io::Error::from(io::ErrorKind::ConnectionReset).into();
        assert!(err.is_closed());
    }

    #[test]
    fn other_io_errors_stay_transport() {
        let err: StreamError = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, StreamError::Transport(_)));
        assert!(err.is_terminal());
    }

    #[test]
    fn only_schema_violation_is_recoverable() {
        assert!(!StreamError::SchemaViolation("bad".into()).is_terminal());
        assert!(StreamError::TruncatedVarint.is_terminal());
        assert!(StreamError::VarintOverflow.is_terminal());
        assert!(StreamError::FrameCorrupt("x".into()).is_terminal());
        assert!(StreamError::TransportClosed.is_terminal());
    }
}
