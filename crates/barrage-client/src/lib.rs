//! Barrage Client Library
//!
//! Async client for the live-room danmaku (barrage) protocol: resolves a
//! room's connection info, authenticates over a WebSocket, keeps the link
//! alive with heartbeats and reconnects with backoff across hosts.
//!
//! # Example
//!
//! ```ignore
//! use barrage_client::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let info = ConnectionInfo::new(
//!         21_000_000,
//!         "token",
//!         vec![HostDescriptor::new("broadcast.example.com", 443)],
//!     );
//!     let (listener, mut notes) = ChannelListener::new();
//!
//!     let client = LiveDanmakuClient::<WebSocketTransport>::builder(21_000_000)
//!         .build_websocket(StaticResolver::new(info), listener)?;
//!     client.start();
//!
//!     while let Some(note) = notes.recv().await {
//!         println!("{:?}", note);
//!     }
//!     Ok(())
//! }
//! ```

pub mod backoff;
pub mod builder;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
mod heartbeat;
pub mod listener;
pub mod queue;
pub mod resolver;
pub mod session;

pub use backoff::BackoffConfig;
pub use builder::LiveDanmakuClientBuilder;
pub use client::{LiveDanmakuClient, CLOSE_NORMAL, STOPPED_REASON};
pub use config::ClientConfig;
pub use dispatch::{DispatchPipeline, CLOSE_POLICY_VIOLATION};
pub use error::{ClientError, Result};
pub use heartbeat::{CLOSE_GOING_AWAY, HEARTBEAT_SEND_FAILED, HEARTBEAT_TIMEOUT};
pub use listener::{
    ChannelListener, ClientNotification, Listener, RecommendScoreFilter, DEFAULT_RECOMMEND_LEVEL,
};
pub use queue::DropOldestQueue;
pub use resolver::{ConnectionInfoResolver, StaticResolver};
pub use session::ConnectionSession;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::builder::LiveDanmakuClientBuilder;
    pub use crate::client::LiveDanmakuClient;
    pub use crate::error::{ClientError, Result};
    pub use crate::listener::{ChannelListener, ClientNotification, Listener};
    pub use crate::resolver::{ConnectionInfoResolver, StaticResolver};
    pub use barrage_core::{Comment, CommentMode, ConnectionInfo, ConnectionState, Event, HostDescriptor};
    pub use barrage_transport::WebSocketTransport;
}
