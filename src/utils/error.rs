//! The `error` module defines the error type shared by every layer of the
//! client.
//!
//! `subscribe` and `publish` only ever return `InvalidArgument`.
//! `NotConnected` and `Transport` are absorbed by the client and repaired by
//! replaying state on the next open event.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PubSubError {
    /// Caller supplied an unusable value (empty channel, null payload, bad scheme).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The transport is not ready to send.
    #[error("transport is not connected")]
    NotConnected,

    /// An inbound frame could not be parsed or lacked required fields.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// The WebSocket layer reported a failure.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The durable outbound store failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<sled::Error> for PubSubError {
    fn from(e: sled::Error) -> Self {
        PubSubError::Persistence(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PubSubError>;
