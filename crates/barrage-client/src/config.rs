//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backoff::BackoffConfig;
use crate::error::{ClientError, Result};

/// Tunables for one client. Every field has a default, so a config file
/// only needs the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// User id sent in AUTH; 0 is anonymous
    pub user_id: u64,
    /// Bounded inbound queue size (drop-oldest)
    pub queue_capacity: usize,
    /// Heartbeat send interval
    pub heartbeat_interval_ms: u64,
    /// Close the connection when no heartbeat reply arrives for this long
    pub heartbeat_timeout_ms: u64,
    /// Poll interval while waiting for AUTH to be verified
    pub verify_poll_ms: u64,
    pub backoff: BackoffConfig,
    pub ws_scheme: String,
    pub ws_path: String,
    /// Drop comments scored below this level (0 = default level 3)
    pub min_recommend_score: Option<u8>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_id: 0,
            queue_capacity: 64,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 70_000,
            verify_poll_ms: 200,
            backoff: BackoffConfig::default(),
            ws_scheme: barrage_core::DEFAULT_WS_SCHEME.to_string(),
            ws_path: barrage_core::DEFAULT_WS_PATH.to_string(),
            min_recommend_score: None,
        }
    }
}

impl ClientConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    pub fn verify_poll(&self) -> Duration {
        Duration::from_millis(self.verify_poll_ms)
    }

    /// Reject settings that would break the session loop
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(ClientError::Config("queue_capacity must be > 0".into()));
        }
        if self.heartbeat_interval_ms == 0 || self.verify_poll_ms == 0 {
            return Err(ClientError::Config(
                "heartbeat_interval_ms and verify_poll_ms must be > 0".into(),
            ));
        }
        if self.heartbeat_timeout_ms < self.heartbeat_interval_ms {
            return Err(ClientError::Config(
                "heartbeat_timeout_ms must be >= heartbeat_interval_ms".into(),
            ));
        }
        if self.backoff.max_ms < self.backoff.base_ms {
            return Err(ClientError::Config(
                "backoff.max_ms must be >= backoff.base_ms".into(),
            ));
        }
        if self.ws_scheme.trim().is_empty() {
            return Err(ClientError::Config("ws_scheme must not be empty".into()));
        }
        Ok(())
    }
}
