//! Barrage Transport Layer
//!
//! The danmaku client talks to a [`Transport`] rather than to a socket
//! library directly. Implementations turn their callbacks or streams into a
//! channel of [`TransportEvent`]s, so the client only ever sees message
//! passing.
//!
//! - WebSocket (default feature, `tokio-tungstenite`)

pub mod error;
pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use error::{Result, TransportError};
pub use traits::{Transport, TransportEvent, TransportReceiver, TransportSender};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConfig, WebSocketReceiver, WebSocketSender, WebSocketTransport};
