//! Velocity client demo
//!
//! Connects to a framing peer (default `127.0.0.1:9090`), sends a run of
//! VELOCITY messages followed by END, and logs whatever comes back.
//!
//! ```text
//! cargo run --example echo_server
//! cargo run --example velocity_client -- 127.0.0.1:9090 10
//! ```

use std::error::Error;
use std::time::Duration;

use tracing::info;
use varframe::tcp::TcpClient;
use varframe::{JsonCodec, Message, TcpConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| "127.0.0.1:9090".to_string());
    let count: usize = match args.next() {
        Some(n) => n.parse()?,
        None => 5,
    };

    info!("Waiting to connect to server...");
    let config = TcpConfig::default().with_connect_timeout(Duration::from_secs(5));
    let session = TcpClient::connect(
        &addr,
        JsonCodec::<Message>::new(),
        config,
        |msg: Message| async move {
            info!("FROM SERVER: {:?} {}", msg.command, msg.data);
        },
    )
    .await?;
    info!("Connected to server");

    for _ in 0..count {
        session.submit(Message::velocity(888)).await?;
    }
    session.submit(Message::end()).await?;

    // Give the peer a moment to answer before hanging up
    tokio::time::sleep(Duration::from_millis(200)).await;

    info!("Closing connection...");
    session.close().await?;

    info!("Client demo completed");
    Ok(())
}
