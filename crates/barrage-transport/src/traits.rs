//! Transport trait definitions

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Events that can occur on a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection established
    Connected,
    /// Connection closed (clean or error)
    Disconnected { reason: Option<String> },
    /// Binary message received
    Data(Bytes),
    /// Text message received
    Text(String),
    /// Error occurred
    Error(String),
}

/// Trait for sending data
#[async_trait]
pub trait TransportSender: Send + Sync {
    /// Send one binary message
    async fn send(&self, data: Bytes) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Close with a status code and reason
    async fn close(&self, code: u16, reason: &str) -> Result<()>;
}

/// Trait for receiving data
#[async_trait]
pub trait TransportReceiver: Send {
    /// Receive the next event; `None` once the connection is gone
    async fn recv(&mut self) -> Option<TransportEvent>;
}

/// A way of opening one duplex, message-oriented connection
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// The sender type for this transport
    type Sender: TransportSender + 'static;
    /// The receiver type for this transport
    type Receiver: TransportReceiver + 'static;

    /// Connect to a remote endpoint
    async fn connect(&self, url: &str) -> Result<(Self::Sender, Self::Receiver)>;
}
