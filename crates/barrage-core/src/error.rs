//! Error types for Barrage

use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Barrage core error types
#[derive(Error, Debug)]
pub enum Error {
    /// Frame body does not fit a u32 length field
    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    /// JSON encoding/decoding error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// zlib inflate failed or exceeded the output limit
    #[error("decompress error: {0}")]
    Decompress(String),
}
