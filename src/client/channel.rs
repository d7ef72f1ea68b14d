//! Channel management
//!
//! A `Channel` holds the ordered handler registrations for one channel name.
//! Registration order is invocation order. Registering the same handler
//! twice is a no-op, so a handler runs at most once per delivery.
//!
//! Concurrency note: callers must synchronize access to `Channel` (the
//! client keeps it behind its state lock).

use crate::client::handler::Handler;

#[derive(Debug)]
pub struct Channel {
    name: String,
    pub handlers: Vec<Handler>,
}

impl Channel {
    /// Create a new channel with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            handlers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a handler. Returns `false` if it was already registered.
    pub fn subscribe(&mut self, handler: Handler) -> bool {
        if self.handlers.contains(&handler) {
            return false;
        }
        self.handlers.push(handler);
        true
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, handler: &Handler) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|h| h != handler);
        self.handlers.len() != before
    }

    pub fn contains(&self, handler: &Handler) -> bool {
        self.handlers.contains(handler)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
