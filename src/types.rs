//! Core types shared by the framing layer and the client session.

use serde::{Deserialize, Serialize};

/// Maximum number of bytes a 32-bit varint length prefix may occupy.
pub const MAX_VARINT_LEN: usize = 5;

/// Default cap on a single frame body (16 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Process-unique session identifier, used in logs.
pub type SessionId = u64;

/// Kind discriminator carried by every application [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    Velocity,
    Position,
    Heading,
    /// Marks the end of a messaging run.
    End,
}

/// Application-level record exchanged over a session.
///
/// The framing layer never looks inside a message; its byte representation is
/// owned by a [`MessageCodec`](crate::message::MessageCodec).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub command: Command,
    pub data: i64,
}

impl Message {
    pub fn new(command: Command, data: i64) -> Self {
        Self { command, data }
    }

    pub fn velocity(data: i64) -> Self {
        Self::new(Command::Velocity, data)
    }

    /// End-of-messaging marker.
    pub fn end() -> Self {
        Self::new(Command::End, 0)
    }

    pub fn is_end(&self) -> bool {
        self.command == Command::End
    }
}

/// Lifecycle of a [`ClientSession`](crate::session::ClientSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport handshake in progress. Only observable through
    /// [`TcpClient::connect_with_states`](crate::tcp::TcpClient::connect_with_states).
    Connecting,
    /// Both loops running.
    Connected,
    /// At least one loop has stopped; waiting for the other.
    Closing,
    /// Both loops exited and the connection has been released.
    Closed,
}

impl SessionState {
    pub fn is_open(self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Connected)
    }
}
