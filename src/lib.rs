//! # pubsub_client
//!
//! `pubsub_client` is a channel-based publish/subscribe client for a hosted
//! backend. It keeps one WebSocket connection open, multiplexes any number of
//! channels and handlers over it, and replays subscriptions and queued
//! publishes every time the connection comes back.
//!
//! ## Core Modules
//!
//! - `client`: the `PubSubClient`, its channel registry and the outbound queue.
//! - `config`: loads endpoint, queue and reconnect settings from file and environment.
//! - `persistence`: optional on-disk storage for queued publishes (sled).
//! - `transport`: wire frames, endpoint derivation and the WebSocket transport.
//! - `utils`: the shared error type and logging setup.

pub mod client;
pub mod config;
pub mod persistence;
pub mod transport;
pub mod utils;

pub use client::{ConnectionState, Handler, MessageHandler, PubSubClient};
pub use config::{Settings, load_config};
pub use transport::EndpointInfo;
pub use utils::error::{PubSubError, Result};
