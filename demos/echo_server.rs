//! Echo server demo
//!
//! Accepts connections on `127.0.0.1:9090` and writes every frame it receives
//! straight back to the sender. Bodies are never decoded.

use std::error::Error;

use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info};
use varframe::{FrameReader, FrameWriter, StreamError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9090".to_string());
    let listener = TcpListener::bind(&addr).await?;
    info!("Echo server bound to {}", addr);

    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                info!("New connection from {}", peer);
                tokio::spawn(async move {
                    match echo(socket).await {
                        Ok(frames) => info!("{} closed after {} frames", peer, frames),
                        Err(e) => error!("{} connection error: {}", peer, e),
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

async fn echo(socket: TcpStream) -> Result<usize, StreamError> {
    let (read, write) = socket.into_split();
    let mut reader = FrameReader::new(read);
    let mut writer = FrameWriter::new(write);

    let mut frames = 0;
    while let Some(body) = reader.next_frame().await? {
        info!("Echoing {} byte frame", body.len());
        writer.write_frame(body).await?;
        frames += 1;
    }
    writer.shutdown().await?;
    Ok(frames)
}
