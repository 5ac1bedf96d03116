//! Client builder pattern

use barrage_transport::{Transport, WebSocketTransport};
use std::sync::Arc;

use crate::backoff::BackoffConfig;
use crate::config::ClientConfig;
use crate::listener::{Listener, RecommendScoreFilter};
use crate::resolver::ConnectionInfoResolver;
use crate::{LiveDanmakuClient, Result};

/// Builder for [`LiveDanmakuClient`]
#[derive(Debug, Clone)]
pub struct LiveDanmakuClientBuilder {
    room_id: u64,
    config: ClientConfig,
}

impl LiveDanmakuClientBuilder {
    /// Create a new builder
    pub fn new(room_id: u64) -> Self {
        Self {
            room_id,
            config: ClientConfig::default(),
        }
    }

    /// Replace the whole config (e.g. one loaded from a file)
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// User id sent in AUTH
    pub fn user_id(mut self, uid: u64) -> Self {
        self.config.user_id = uid;
        self
    }

    /// Inbound queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Heartbeat interval in milliseconds
    pub fn heartbeat_interval(mut self, ms: u64) -> Self {
        self.config.heartbeat_interval_ms = ms;
        self
    }

    /// Heartbeat reply timeout in milliseconds
    pub fn heartbeat_timeout(mut self, ms: u64) -> Self {
        self.config.heartbeat_timeout_ms = ms;
        self
    }

    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// URL scheme and path used for every host
    pub fn endpoint(mut self, scheme: &str, path: &str) -> Self {
        self.config.ws_scheme = scheme.to_string();
        self.config.ws_path = path.to_string();
        self
    }

    /// Drop comments scored below `level` (0 selects the default level)
    pub fn min_recommend_score(mut self, level: u8) -> Self {
        self.config.min_recommend_score = Some(level);
        self
    }

    /// Validate the config and assemble the client. Does not connect.
    pub fn build<T, R, L>(self, transport: T, resolver: R, listener: L) -> Result<LiveDanmakuClient<T>>
    where
        T: Transport,
        R: ConnectionInfoResolver,
        L: Listener,
    {
        self.config.validate()?;

        let listener: Arc<dyn Listener> = match self.config.min_recommend_score {
            Some(level) => Arc::new(RecommendScoreFilter::new(listener, level)),
            None => Arc::new(listener),
        };

        Ok(LiveDanmakuClient::new(
            self.room_id,
            self.config,
            transport,
            Arc::new(resolver),
            listener,
        ))
    }

    /// Build over the default WebSocket transport
    pub fn build_websocket<R, L>(
        self,
        resolver: R,
        listener: L,
    ) -> Result<LiveDanmakuClient<WebSocketTransport>>
    where
        R: ConnectionInfoResolver,
        L: Listener,
    {
        self.build(WebSocketTransport::new(), resolver, listener)
    }
}
