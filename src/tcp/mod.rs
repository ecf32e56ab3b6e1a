//! TCP transport for client sessions

mod client;

pub use client::TcpClient;
