//! Client error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("connection info is empty (blank token or no usable hosts)")]
    EmptyConnectionInfo,

    #[error("failed to resolve connection info: {0}")]
    Resolve(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] barrage_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] barrage_transport::TransportError),

    #[error("invalid config: {0}")]
    Config(String),
}
