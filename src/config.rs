use std::time::Duration;

use crate::error::{Result, StreamError};
use crate::reader::DEFAULT_READ_CAPACITY;
use crate::types::DEFAULT_MAX_FRAME_SIZE;

/// Default number of messages that may wait in the outbound queue.
pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 1024;

/// Default time `close()` waits for queued messages to be written.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// What a session does when the message codec rejects a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaPolicy {
    /// Log the violation, drop that message and keep the session running.
    #[default]
    Skip,
    /// Treat the violation as terminal and close the session.
    Close,
}

/// Configuration for a client session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Largest frame body accepted or sent
    pub max_frame_size: usize,
    /// Initial receive buffer capacity
    pub read_buffer_capacity: usize,
    /// Bound on queued outbound messages; `submit` waits when full
    pub outbound_queue_capacity: usize,
    pub schema_policy: SchemaPolicy,
    /// How long `close()` drains the outbound queue before aborting;
    /// `None` waits indefinitely
    pub drain_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_buffer_capacity: DEFAULT_READ_CAPACITY,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            schema_policy: SchemaPolicy::default(),
            drain_timeout: Some(DEFAULT_DRAIN_TIMEOUT),
        }
    }
}

impl SessionConfig {
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn with_read_buffer_capacity(mut self, capacity: usize) -> Self {
        self.read_buffer_capacity = capacity;
        self
    }

    pub fn with_outbound_queue_capacity(mut self, capacity: usize) -> Self {
        self.outbound_queue_capacity = capacity;
        self
    }

    pub fn with_schema_policy(mut self, policy: SchemaPolicy) -> Self {
        self.schema_policy = policy;
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = Some(timeout);
        self
    }

    /// Let `close()` wait for the queue to drain however long it takes.
    pub fn without_drain_timeout(mut self) -> Self {
        self.drain_timeout = None;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_frame_size == 0 {
            return Err(StreamError::Config("max_frame_size must be non-zero".into()));
        }
        if self.max_frame_size as u64 > u64::from(u32::MAX) {
            return Err(StreamError::Config(format!(
                "max_frame_size {} exceeds the 32-bit length prefix",
                self.max_frame_size
            )));
        }
        if self.read_buffer_capacity == 0 {
            return Err(StreamError::Config(
                "read_buffer_capacity must be non-zero".into(),
            ));
        }
        if self.outbound_queue_capacity == 0 {
            return Err(StreamError::Config(
                "outbound_queue_capacity must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the TCP transport
#[derive(Debug, Clone)]
pub struct TcpConfig {
    pub session: SessionConfig,
    /// Disable Nagle's algorithm on the socket
    pub nodelay: bool,
    /// Deadline for establishing the connection; `None` waits indefinitely
    pub connect_timeout: Option<Duration>,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            nodelay: true,
            connect_timeout: None,
        }
    }
}

impl TcpConfig {
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SessionConfig::default().validate().unwrap();
        let tcp = TcpConfig::default();
        assert!(tcp.nodelay);
        assert!(tcp.connect_timeout.is_none());
        assert_eq!(tcp.session.schema_policy, SchemaPolicy::Skip);
        assert_eq!(tcp.session.drain_timeout, Some(DEFAULT_DRAIN_TIMEOUT));
    }

    #[test]
    fn rejects_zero_sizes() {
        let cfg = SessionConfig::default().with_max_frame_size(0);
        assert!(matches!(cfg.validate(), Err(StreamError::Config(_))));

        let cfg = SessionConfig::default().with_outbound_queue_capacity(0);
        assert!(matches!(cfg.validate(), Err(StreamError::Config(_))));
    }

    #[test]
    fn drain_timeout_builders() {
        let cfg = SessionConfig::default().with_drain_timeout(Duration::from_millis(250));
        assert_eq!(cfg.drain_timeout, Some(Duration::from_millis(250)));
        assert!(cfg.without_drain_timeout().drain_timeout.is_none());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn rejects_frame_size_wider_than_prefix() {
        let cfg = SessionConfig::default().with_max_frame_size(u32::MAX as usize + 1);
        assert!(matches!(cfg.validate(), Err(StreamError::Config(_))));
    }
}
