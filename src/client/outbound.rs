//! Outbound queue
//!
//! Holds `publish` calls made while the transport is not open. The queue is
//! drained in FIFO order exactly once per open event. With an
//! `OutboundStore` attached, every entry is mirrored to disk so queued
//! publishes survive a restart.
//!
//! The disk copy outlives `drain_all` and is only rewritten by `commit`,
//! which the client calls once a replay has handed every entry to the
//! transport. A crash mid-replay therefore replays those entries again on
//! the next start. Entries the transport accepted but never wrote to the
//! socket are not recovered.

use std::collections::VecDeque;

use serde_json::Value;
use tracing::{error, warn};

use crate::persistence::OutboundStore;
use crate::utils::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub channel: String,
    pub data: Value,
}

impl OutboundMessage {
    pub fn new(channel: impl Into<String>, data: Value) -> Self {
        Self {
            channel: channel.into(),
            data,
        }
    }
}

#[derive(Debug, Default)]
pub struct OutboundQueue {
    entries: VecDeque<OutboundMessage>,
    limit: Option<usize>,
    store: Option<OutboundStore>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the queue at `limit` entries; the oldest entry is dropped when full.
    pub fn with_capacity_limit(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Back the queue with a durable store, reloading anything it holds.
    pub fn with_store(store: OutboundStore, limit: Option<usize>) -> Result<Self> {
        let entries: VecDeque<OutboundMessage> = store.load_all()?.into_iter().collect();
        let mut queue = Self {
            entries,
            limit,
            store: Some(store),
        };
        let dropped = queue.trim_to_limit();
        queue.forget_persisted(dropped);
        Ok(queue)
    }

    pub fn enqueue(&mut self, channel: &str, data: Value) {
        let message = OutboundMessage::new(channel, data);
        if let Some(store) = &self.store {
            if let Err(e) = store.append(&message) {
                error!("Failed to persist queued message for {channel}: {e}");
            }
        }
        self.entries.push_back(message);
        let dropped = self.trim_to_limit();
        self.forget_persisted(dropped);
    }

    /// Remove and return every entry, oldest first. Persisted copies stay
    /// on disk until `commit`.
    pub fn drain_all(&mut self) -> Vec<OutboundMessage> {
        self.entries.drain(..).collect()
    }

    /// Make the durable store match the in-memory queue.
    pub fn commit(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let result = if self.entries.is_empty() {
            store.clear()
        } else {
            store.replace_all(self.entries.iter())
        };
        if let Err(e) = result {
            error!("Failed to rewrite persisted outbound queue: {e}");
        }
    }

    /// Put unsent entries back ahead of anything queued since the drain.
    pub fn requeue_front(&mut self, messages: Vec<OutboundMessage>) {
        for message in messages.into_iter().rev() {
            self.entries.push_front(message);
        }
        self.trim_to_limit();
        self.commit();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutboundMessage> {
        self.entries.iter()
    }

    /// Drop the oldest in-memory entries beyond the limit; returns how many.
    fn trim_to_limit(&mut self) -> usize {
        let Some(limit) = self.limit else {
            return 0;
        };

        let excess = self.entries.len().saturating_sub(limit);
        for dropped in self.entries.drain(..excess) {
            warn!(
                "Outbound queue full ({limit}), dropping oldest message for {}",
                dropped.channel
            );
        }
        excess
    }

    fn forget_persisted(&self, count: usize) {
        if count == 0 {
            return;
        }
        if let Some(store) = &self.store {
            if let Err(e) = store.remove_first(count) {
                error!("Failed to trim persisted outbound queue: {e}");
            }
        }
    }
}
