//! Channel registry
//!
//! Maps channel names to their handler registrations and reports when a
//! channel comes into or goes out of existence, which is when the client
//! must send `sub` / `unsub` frames.
//!
//! Channels are kept in first-registration order so replay after a
//! reconnect is deterministic.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, error};

use crate::client::channel::Channel;
use crate::client::handler::Handler;

#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: HashMap<String, Channel>,
    order: Vec<String>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` on `channel`, creating the channel if needed.
    ///
    /// Returns `true` when this registration created the channel.
    pub fn register(&mut self, channel: &str, handler: Handler) -> bool {
        let created = !self.channels.contains_key(channel);
        let entry = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| Channel::new(channel));

        if !entry.subscribe(handler) {
            debug!("Handler already registered on {channel}");
        }

        if created {
            self.order.push(channel.to_string());
        }
        created
    }

    /// Remove one registration. Returns `true` when that left the channel
    /// empty and it was deleted. Unknown handlers and channels are a no-op.
    pub fn unregister(&mut self, channel: &str, handler: &Handler) -> bool {
        let emptied = match self.channels.get_mut(channel) {
            Some(entry) => entry.unsubscribe(handler) && entry.is_empty(),
            None => false,
        };

        if emptied {
            self.remove_channel(channel);
        }
        emptied
    }

    /// Remove and return every registration for `channel`.
    pub fn unregister_all(&mut self, channel: &str) -> Vec<Handler> {
        self.remove_channel(channel)
            .map(|entry| entry.handlers)
            .unwrap_or_default()
    }

    pub fn contains(&self, channel: &str, handler: &Handler) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|entry| entry.contains(handler))
    }

    /// Channel names in first-registration order.
    pub fn channels(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Snapshot of the handlers for `channel`, in registration order.
    pub fn handlers(&self, channel: &str) -> Vec<Handler> {
        self.channels
            .get(channel)
            .map(|entry| entry.handlers.clone())
            .unwrap_or_default()
    }

    /// Prepare a dispatch of one delivery over the current registrations.
    pub fn dispatch(&self, channel: &str) -> Dispatch {
        Dispatch {
            channel: channel.to_string(),
            handlers: self.handlers(channel),
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    fn remove_channel(&mut self, channel: &str) -> Option<Channel> {
        let removed = self.channels.remove(channel)?;
        self.order.retain(|name| name != channel);
        debug!(
            "Removed channel {} with {} handler(s)",
            removed.name(),
            removed.handlers.len()
        );
        Some(removed)
    }
}

/// A snapshot of a channel's handlers, run outside the registry lock so
/// handlers may subscribe or unsubscribe while being invoked.
#[derive(Debug)]
pub struct Dispatch {
    channel: String,
    handlers: Vec<Handler>,
}

impl Dispatch {
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invoke each handler in registration order.
    ///
    /// `still_registered` is consulted before every call so a handler
    /// removed by an earlier one in this dispatch is skipped. A panicking
    /// handler is logged and does not stop the rest. Returns how many
    /// handlers ran.
    pub fn run<F>(self, data: &Value, still_registered: F) -> usize
    where
        F: Fn(&str, &Handler) -> bool,
    {
        let mut invoked = 0;
        for handler in &self.handlers {
            if !still_registered(&self.channel, handler) {
                continue;
            }
            invoked += 1;
            if !handler.invoke(&self.channel, data) {
                error!(
                    "Handler {} panicked on channel {}; continuing dispatch",
                    handler.id(),
                    self.channel
                );
            }
        }
        invoked
    }
}
