//! Client session: one connection, one inbound loop, one outbound loop.
//!
//! ```text
//!                    ┌──────────── inbound task ────────────┐
//! Connection (read) ─► FrameReader ─► MessageCodec ─► handler
//!
//! submit() ─► queue ─► MessageCodec ─► FrameWriter ─► Connection (write)
//!                    └──────────── outbound task ───────────┘
//! ```
//!
//! The loops own the two halves of the connection. Whichever loop stops
//! first, by returning or by panicking, cancels the other; the connection is
//! released when both are gone.

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use crate::codec::VarintFrameCodec;
use crate::config::{SchemaPolicy, SessionConfig};
use crate::error::{Result, StreamError};
use crate::message::MessageCodec;
use crate::reader::FrameReader;
use crate::types::{SessionId, SessionState};
use crate::writer::FrameWriter;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// A running session over a single connection.
///
/// Messages passed to [`submit`](Self::submit) are written in submission
/// order by the outbound loop. Every inbound message is handed to the handler
/// given at start-up, one at a time and in arrival order.
///
/// Dropping the session aborts it: both loops are cancelled, queued messages
/// are discarded and the connection is released.
pub struct ClientSession<C: MessageCodec> {
    id: SessionId,
    outbound: Option<mpsc::Sender<C::Message>>,
    state: watch::Receiver<SessionState>,
    shutdown: CancellationToken,
    drain_timeout: Option<Duration>,
    span: Span,
    supervisor: Option<JoinHandle<Result<()>>>,
}

impl<C: MessageCodec> ClientSession<C> {
    /// Start a session over a bidirectional stream.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<T, F, Fut>(io: T, codec: C, config: SessionConfig, handler: F) -> Result<Self>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
        F: FnMut(C::Message) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(io);
        Self::start_split(reader, writer, codec, config, handler)
    }

    /// Start a session over an already split connection.
    pub fn start_split<R, W, F, Fut>(
        reader: R,
        writer: W,
        codec: C,
        config: SessionConfig,
        handler: F,
    ) -> Result<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        F: FnMut(C::Message) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (states, _) = watch::channel(SessionState::Connecting);
        Self::launch(reader, writer, codec, config, handler, states)
    }

    /// Spawn both loops, publishing transitions on `states`.
    ///
    /// `states` may already have observers that watched the transport
    /// handshake in [`SessionState::Connecting`].
    pub(crate) fn launch<R, W, F, Fut>(
        reader: R,
        writer: W,
        codec: C,
        config: SessionConfig,
        handler: F,
        states: watch::Sender<SessionState>,
    ) -> Result<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        F: FnMut(C::Message) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        config.validate()?;

        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let span = info_span!("session", id);
        let state_rx = states.subscribe();
        let state_tx = Arc::new(states);
        let (tx, rx) = mpsc::channel(config.outbound_queue_capacity);
        let shutdown = CancellationToken::new();
        let codec = Arc::new(codec);

        let reader = FrameReader::with_codec(
            reader,
            VarintFrameCodec::with_max_frame_size(config.max_frame_size),
            config.read_buffer_capacity,
        );
        let writer = FrameWriter::with_max_frame_size(writer, config.max_frame_size);

        state_tx.send_replace(SessionState::Connected);
        span.in_scope(|| info!("session started"));

        let inbound = tokio::spawn(
            InboundLoop {
                reader,
                codec: codec.clone(),
                policy: config.schema_policy,
                shutdown: shutdown.clone(),
                state: state_tx.clone(),
            }
            .run(handler)
            .instrument(span.clone()),
        );

        let outbound = tokio::spawn(
            OutboundLoop {
                writer,
                codec,
                policy: config.schema_policy,
                shutdown: shutdown.clone(),
                state: state_tx.clone(),
            }
            .run(rx)
            .instrument(span.clone()),
        );

        let supervisor = tokio::spawn(
            async move {
                let (inbound, outbound) = tokio::join!(inbound, outbound);
                state_tx.send_replace(SessionState::Closed);
                info!("session closed");
                flatten(inbound).and(flatten(outbound))
            }
            .instrument(span.clone()),
        );

        Ok(Self {
            id,
            outbound: Some(tx),
            state: state_rx,
            shutdown,
            drain_timeout: config.drain_timeout,
            span,
            supervisor: Some(supervisor),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Queue `message` for the outbound loop.
    ///
    /// Waits while the queue is full. Fails with
    /// [`StreamError::TransportClosed`] once the session has stopped.
    pub async fn submit(&self, message: C::Message) -> Result<()> {
        let tx = self.outbound.as_ref().ok_or(StreamError::TransportClosed)?;
        tx.send(message)
            .await
            .map_err(|_| StreamError::TransportClosed)
    }

    /// Close the session gracefully.
    ///
    /// Queued messages are written and the write side is shut down before the
    /// inbound loop is stopped. If draining takes longer than the configured
    /// `drain_timeout` the session is aborted, and a write cut short that way
    /// surfaces as [`StreamError::TransportClosed`]. Returns the error that
    /// ended the session, if one did.
    pub async fn close(mut self) -> Result<()> {
        self.span.in_scope(|| info!("closing session"));
        self.outbound.take();

        let Some(mut supervisor) = self.supervisor.take() else {
            return Ok(());
        };
        let Some(limit) = self.drain_timeout else {
            return join_supervisor(supervisor).await;
        };

        match tokio::time::timeout(limit, &mut supervisor).await {
            Ok(joined) => flatten(joined),
            Err(_) => {
                self.span
                    .in_scope(|| warn!("drain did not finish within {:?}, aborting", limit));
                self.shutdown.cancel();
                join_supervisor(supervisor).await
            }
        }
    }

    /// Stop both loops immediately.
    ///
    /// Queued messages are discarded. A frame that was being written, or
    /// partially received, is reported as [`StreamError::TransportClosed`].
    pub async fn abort(mut self) -> Result<()> {
        self.span.in_scope(|| info!("aborting session"));
        self.outbound.take();
        self.shutdown.cancel();
        match self.supervisor.take() {
            Some(supervisor) => join_supervisor(supervisor).await,
            None => Ok(()),
        }
    }

    /// Wait for the session to end on its own, typically because the peer
    /// closed the connection.
    pub async fn join(mut self) -> Result<()> {
        match self.supervisor.take() {
            Some(supervisor) => join_supervisor(supervisor).await,
            None => Ok(()),
        }
    }
}

impl<C: MessageCodec> Drop for ClientSession<C> {
    fn drop(&mut self) {
        if self.supervisor.is_some() {
            self.span.in_scope(|| debug!("session dropped, cancelling loops"));
        }
        self.shutdown.cancel();
    }
}

async fn join_supervisor(supervisor: JoinHandle<Result<()>>) -> Result<()> {
    flatten(supervisor.await)
}

fn flatten(joined: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    joined.map_err(|e| StreamError::Transport(io::Error::new(io::ErrorKind::Other, e)))?
}

fn mark_closing(state: &watch::Sender<SessionState>) {
    state.send_if_modified(|current| {
        if current.is_open() {
            *current = SessionState::Closing;
            true
        } else {
            false
        }
    });
}

/// Moves the session to `Closing` and cancels the sibling loop when a loop
/// exits, including by unwinding out of a panicking handler.
struct LoopExit {
    shutdown: CancellationToken,
    state: Arc<watch::Sender<SessionState>>,
}

impl Drop for LoopExit {
    fn drop(&mut self) {
        mark_closing(&self.state);
        self.shutdown.cancel();
    }
}

struct InboundLoop<R, C> {
    reader: FrameReader<R>,
    codec: Arc<C>,
    policy: SchemaPolicy,
    shutdown: CancellationToken,
    state: Arc<watch::Sender<SessionState>>,
}

impl<R, C> InboundLoop<R, C>
where
    R: AsyncRead + Unpin,
    C: MessageCodec,
{
    async fn run<F, Fut>(mut self, mut handler: F) -> Result<()>
    where
        F: FnMut(C::Message) -> Fut,
        Fut: Future<Output = ()>,
    {
        let _exit = LoopExit {
            shutdown: self.shutdown.clone(),
            state: self.state.clone(),
        };
        debug!("inbound loop started");

        let result = loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => None,
                next = self.reader.next_frame() => Some(next),
            };

            let Some(next) = next else {
                if self.reader.buffered_len() > 0 {
                    debug!(
                        "inbound loop cancelled with {} bytes of a partial frame",
                        self.reader.buffered_len()
                    );
                    break Err(StreamError::TransportClosed);
                }
                debug!("inbound loop cancelled");
                break Ok(());
            };

            match next {
                Ok(Some(body)) => match self.codec.deserialize(body) {
                    Ok(message) => handler(message).await,
                    Err(e) if !e.is_terminal() && self.policy == SchemaPolicy::Skip => {
                        warn!("skipping inbound message: {}", e);
                    }
                    Err(e) => {
                        error!("inbound message rejected: {}", e);
                        break Err(e);
                    }
                },
                Ok(None) => {
                    info!("peer closed the connection");
                    break Ok(());
                }
                Err(e) => {
                    // frame boundaries are lost; no way to resynchronise
                    error!("inbound stream error: {}", e);
                    break Err(e);
                }
            }
        };

        debug!("inbound loop stopped");
        result
    }
}

struct OutboundLoop<W, C> {
    writer: FrameWriter<W>,
    codec: Arc<C>,
    policy: SchemaPolicy,
    shutdown: CancellationToken,
    state: Arc<watch::Sender<SessionState>>,
}

impl<W, C> OutboundLoop<W, C>
where
    W: AsyncWrite + Unpin,
    C: MessageCodec,
{
    async fn run(mut self, mut queue: mpsc::Receiver<C::Message>) -> Result<()> {
        let _exit = LoopExit {
            shutdown: self.shutdown.clone(),
            state: self.state.clone(),
        };
        debug!("outbound loop started");

        let result = loop {
            let message = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    debug!("outbound loop cancelled");
                    break Ok(());
                }
                message = queue.recv() => message,
            };

            let Some(message) = message else {
                debug!("outbound queue closed, shutting down write side");
                break tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => Ok(()),
                    shut = self.writer.shutdown() => shut,
                };
            };

            let body = match self.codec.serialize(&message) {
                Ok(body) => body,
                Err(e) if !e.is_terminal() && self.policy == SchemaPolicy::Skip => {
                    warn!("skipping outbound message: {}", e);
                    continue;
                }
                Err(e) => {
                    error!("outbound message rejected: {}", e);
                    break Err(e);
                }
            };

            if body.len() > self.writer.max_frame_size() {
                warn!(
                    "dropping outbound message of {} bytes (max {})",
                    body.len(),
                    self.writer.max_frame_size()
                );
                continue;
            }

            let written = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => None,
                written = self.writer.write_frame(body) => Some(written),
            };

            match written {
                Some(Ok(())) => {}
                Some(Err(e)) => {
                    error!("outbound write failed: {}", e);
                    break Err(e);
                }
                None => {
                    debug!("outbound write abandoned");
                    break Err(StreamError::TransportClosed);
                }
            }
        };

        debug!("outbound loop stopped");
        result
    }
}
