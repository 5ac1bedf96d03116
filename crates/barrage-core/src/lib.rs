//! Barrage Core
//!
//! Wire codec and shared types for the live danmaku (comment stream) protocol.
//!
//! This crate provides:
//! - Binary frame encoding/decoding ([`Frame`], [`codec`])
//! - Recursive zlib expansion of batched frames ([`decode_all`])
//! - Command payload parsing into typed events ([`command`])
//! - Connection info, host and event types ([`types`])
//!
//! Everything here is pure: no I/O, no shared mutable state.

pub mod codec;
pub mod command;
pub mod error;
pub mod frame;
pub mod time;
pub mod types;

pub use codec::{decode_all, encode};
pub use command::parse_command;
pub use error::{Error, Result};
pub use frame::{Frame, Operation, ProtocolVersion, HEADER_SIZE};
pub use types::*;

/// Compression capability requested in the AUTH payload (zlib)
pub const AUTH_PROTOCOL_VERSION: u16 = 2;

/// Platform tag sent in the AUTH payload
pub const AUTH_PLATFORM: &str = "web";

/// Auth type sent in the AUTH payload
pub const AUTH_TYPE: u8 = 2;

/// Default WebSocket path on danmaku hosts
pub const DEFAULT_WS_PATH: &str = "sub";

/// Default WebSocket scheme
pub const DEFAULT_WS_SCHEME: &str = "wss";
