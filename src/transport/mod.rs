//! The `transport` module owns the persistent connection to the pub/sub
//! service.
//!
//! It defines the wire frames, derives the WebSocket endpoint, and exposes
//! the `Transport` abstraction the client is written against, together with
//! a `tokio-tungstenite` implementation that reconnects on its own.

pub mod endpoint;
pub mod message;
pub mod reconnect;
pub mod websocket;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use url::Url;

use crate::utils::error::{PubSubError, Result};

pub use endpoint::EndpointInfo;
pub use message::{ClientFrame, Delivery};
pub use reconnect::ExponentialBackoff;
pub use websocket::{WebSocketTransport, WebSocketTransportFactory};

/// A persistent, bidirectional text connection.
pub trait Transport: Send + Sync {
    /// Begin opening the connection. Completion is reported through
    /// `TransportListener::on_open`.
    fn connect(&self);

    /// True only once the connection is established and ready to send.
    fn is_open(&self) -> bool;

    /// Queue a text frame. Fails with `NotConnected` when not open.
    fn send(&self, text: &str) -> Result<()>;

    /// Tear the connection down and stop any reconnection.
    fn close(&self);
}

/// Callbacks a transport invokes, typically from its own I/O task.
pub trait TransportListener: Send + Sync {
    fn on_open(&self, status_code: u16, status_message: &str);
    fn on_message(&self, text: &str);
    fn on_close(&self, reason: &str);
    fn on_error(&self, error: &PubSubError);
}

/// Builds transports bound to a listener.
pub trait TransportFactory: Send + Sync {
    fn create(&self, url: Url, listener: Arc<dyn TransportListener>) -> Arc<dyn Transport>;
}
