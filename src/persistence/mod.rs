//! The `persistence` module keeps queued publishes on disk so they survive
//! a restart of the host application.
//!
//! It uses `sled` as an embedded key-value store.

pub mod outbound_store;

pub use outbound_store::{OutboundStore, StoredMessage};

#[cfg(test)]
mod tests;
