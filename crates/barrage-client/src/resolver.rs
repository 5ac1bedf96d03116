//! Connection info resolution
//!
//! Looking up a room's token and hosts is done by the embedding application
//! (usually an authenticated REST call). The client only consumes the result.

use async_trait::async_trait;
use barrage_core::ConnectionInfo;

#[async_trait]
pub trait ConnectionInfoResolver: Send + Sync + 'static {
    /// Resolve the token and candidate hosts for `room_id`
    async fn resolve(&self, room_id: u64) -> anyhow::Result<ConnectionInfo>;
}

/// Always returns the same connection info
#[derive(Debug, Clone)]
pub struct StaticResolver {
    info: ConnectionInfo,
}

impl StaticResolver {
    pub fn new(info: ConnectionInfo) -> Self {
        Self { info }
    }
}

#[async_trait]
impl ConnectionInfoResolver for StaticResolver {
    async fn resolve(&self, _room_id: u64) -> anyhow::Result<ConnectionInfo> {
        Ok(self.info.clone())
    }
}
