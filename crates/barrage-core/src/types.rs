//! Core protocol types

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ============================================================================
// Hosts and connection info
// ============================================================================

/// One reachable danmaku endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostDescriptor {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub wss_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_port: Option<u16>,
}

impl HostDescriptor {
    pub fn new(host: impl Into<String>, wss_port: u16) -> Self {
        Self {
            host: host.into(),
            wss_port,
            port: None,
            ws_port: None,
        }
    }

    /// `host:port` identity used for de-duplication
    pub fn key(&self) -> String {
        format!("{}:{}", self.host, self.wss_port)
    }

    /// Build the stream URL, e.g. `wss://host:443/sub`
    pub fn url(&self, scheme: &str, path: &str) -> String {
        format!(
            "{}://{}:{}/{}",
            scheme,
            self.host,
            self.wss_port,
            path.trim_start_matches('/')
        )
    }

    fn is_usable(&self) -> bool {
        !self.host.trim().is_empty() && self.wss_port > 0
    }
}

impl fmt::Display for HostDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.wss_port)
    }
}

/// Drop unusable hosts and duplicates, keeping first-seen order.
pub fn normalize_hosts(hosts: &[HostDescriptor]) -> Vec<HostDescriptor> {
    let mut seen = HashSet::new();
    hosts
        .iter()
        .filter(|h| h.is_usable())
        .filter(|h| seen.insert(h.key()))
        .cloned()
        .collect()
}

/// Parameters needed to open a stream for one room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Resolved (long) room id
    pub room_id: u64,
    pub token: String,
    #[serde(default, alias = "host_list")]
    pub hosts: Vec<HostDescriptor>,
}

impl ConnectionInfo {
    pub fn new(room_id: u64, token: impl Into<String>, hosts: Vec<HostDescriptor>) -> Self {
        Self {
            room_id,
            token: token.into(),
            hosts,
        }
    }
}

// ============================================================================
// Handshake payloads
// ============================================================================

/// JSON body of the AUTH frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub uid: u64,
    pub roomid: u64,
    pub protover: u16,
    pub platform: String,
    #[serde(rename = "type")]
    pub auth_type: u8,
    pub key: String,
}

impl AuthRequest {
    pub fn new(uid: u64, room_id: u64, token: &str) -> Self {
        Self {
            uid,
            roomid: room_id,
            protover: crate::AUTH_PROTOCOL_VERSION,
            platform: crate::AUTH_PLATFORM.to_string(),
            auth_type: crate::AUTH_TYPE,
            key: token.to_string(),
        }
    }

    pub fn to_json(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Status code carried in an AUTH_REPLY body.
///
/// Returns -1 when the body is not JSON or has no integer `code`.
pub fn auth_reply_code(body: &[u8]) -> i64 {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("code").and_then(|c| c.as_i64()))
        .unwrap_or(-1)
}

// ============================================================================
// Connection state
// ============================================================================

/// Externally observed connection state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected { host: String },
    Reconnecting { attempt: u32, delay_ms: u64 },
    Disconnected { reason: Option<String> },
    Error { message: String },
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected { host } => write!(f, "connected to {}", host),
            ConnectionState::Reconnecting { attempt, delay_ms } => {
                write!(f, "reconnecting (attempt {}, in {}ms)", attempt, delay_ms)
            }
            ConnectionState::Disconnected { reason: Some(reason) } => {
                write!(f, "disconnected: {}", reason)
            }
            ConnectionState::Disconnected { reason: None } => write!(f, "disconnected"),
            ConnectionState::Error { message } => write!(f, "error: {}", message),
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// How a comment is laid out on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentMode {
    #[default]
    Scroll,
    Top,
    Bottom,
}

impl CommentMode {
    /// Map the upstream mode number (4 = bottom, 5 = top, anything else scrolls)
    pub fn from_code(code: i64) -> Self {
        match code {
            5 => CommentMode::Top,
            4 => CommentMode::Bottom,
            _ => CommentMode::Scroll,
        }
    }
}

/// A single live comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub mode: CommentMode,
    /// Opaque ARGB colour
    pub color: u32,
    pub timestamp_ms: i64,
    /// Upstream moderation score, 0..=10
    pub recommend_score: u8,
    pub user_id: u64,
    /// Passed through verbatim; may be partially masked upstream
    pub user_name: String,
}

/// Typed events produced from the stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Comment(Comment),
    PopularityUpdate { value: u32 },
}
