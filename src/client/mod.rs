//! The `client` module is the application-facing side of the crate.
//!
//! `PubSubClient` keeps a registry of channel handlers and a queue of
//! offline publishes, and keeps both in sync with the service over whatever
//! transport it is configured with.

pub mod channel;
pub mod handler;
pub mod outbound;
pub mod pubsub_client;
pub mod registry;

pub use handler::{Handler, MessageHandler};
pub use outbound::{OutboundMessage, OutboundQueue};
pub use pubsub_client::{ConnectionState, PubSubClient};
pub use registry::ChannelRegistry;
