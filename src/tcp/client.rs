use std::future::Future;
use std::io;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::TcpConfig;
use crate::error::{Result, StreamError};
use crate::message::MessageCodec;
use crate::session::ClientSession;
use crate::types::SessionState;

/// Opens TCP connections and runs a [`ClientSession`] over them.
pub struct TcpClient;

impl TcpClient {
    /// Connect to `addr` and start a session.
    ///
    /// `handler` receives every inbound message in arrival order.
    pub async fn connect<C, F, Fut>(
        addr: &str,
        codec: C,
        config: TcpConfig,
        handler: F,
    ) -> Result<ClientSession<C>>
    where
        C: MessageCodec,
        F: FnMut(C::Message) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (states, _) = watch::channel(SessionState::Connecting);
        Self::connect_with_states(addr, codec, config, handler, states).await
    }

    /// Like [`connect`](Self::connect), but publishes every transition on
    /// `states`, starting with [`SessionState::Connecting`] while the
    /// connection is being established.
    ///
    /// A failed connect leaves `states` at [`SessionState::Closed`].
    pub async fn connect_with_states<C, F, Fut>(
        addr: &str,
        codec: C,
        config: TcpConfig,
        handler: F,
        states: watch::Sender<SessionState>,
    ) -> Result<ClientSession<C>>
    where
        C: MessageCodec,
        F: FnMut(C::Message) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        config.session.validate()?;
        states.send_replace(SessionState::Connecting);

        let stream = match Self::open(addr, &config).await {
            Ok(stream) => stream,
            Err(e) => {
                states.send_replace(SessionState::Closed);
                return Err(e);
            }
        };
        let (reader, writer) = stream.into_split();
        ClientSession::launch(reader, writer, codec, config.session, handler, states)
    }

    /// Establish the raw connection, honouring the configured deadline.
    pub async fn open(addr: &str, config: &TcpConfig) -> Result<TcpStream> {
        info!("connecting to {}", addr);

        let stream = match config.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, TcpStream::connect(addr))
                .await
                .map_err(|_| {
                    StreamError::Transport(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("connect to {} timed out after {:?}", addr, limit),
                    ))
                })??,
            None => TcpStream::connect(addr).await?,
        };

        stream.set_nodelay(config.nodelay)?;
        info!("connected to {}", stream.peer_addr()?);
        debug!("nodelay = {}", config.nodelay);
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::RawCodec;
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        // bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = TcpClient::connect(&addr, RawCodec, TcpConfig::default(), |_| async {}).await;
        assert!(matches!(result, Err(StreamError::Transport(_))));
    }

    #[tokio::test]
    async fn refused_connection_ends_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let (states, seen) = watch::channel(SessionState::Connecting);
        let result = TcpClient::connect_with_states(
            &addr,
            RawCodec,
            TcpConfig::default(),
            |_| async {},
            states,
        )
        .await;

        assert!(matches!(result, Err(StreamError::Transport(_))));
        assert_eq!(*seen.borrow(), SessionState::Closed);
    }

    #[tokio::test]
    async fn connecting_is_observable_before_connected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let (states, seen) = watch::channel(SessionState::Closed);
        let connect = TcpClient::connect_with_states(
            &addr,
            RawCodec,
            TcpConfig::default(),
            |_| async {},
            states,
        );
        tokio::pin!(connect);

        if futures::poll!(connect.as_mut()).is_pending() {
            assert_eq!(*seen.borrow(), SessionState::Connecting);
        }

        // never accepted; the listen backlog completes the handshake
        let session = connect.await.unwrap();
        assert_eq!(*seen.borrow(), SessionState::Connected);

        session.abort().await.unwrap();
        assert_eq!(*seen.borrow(), SessionState::Closed);
    }

    #[tokio::test]
    async fn open_applies_nodelay() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let config = TcpConfig::default()
            .with_nodelay(true)
            .with_connect_timeout(Duration::from_secs(5));
        let stream = TcpClient::open(&addr, &config).await.unwrap();
        assert!(stream.nodelay().unwrap());
    }
}
