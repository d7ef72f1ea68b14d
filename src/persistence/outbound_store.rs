//! Durable outbound queue backed by `sled`
//!
//! Entries live in the `outbound` tree. Keys are big-endian ids from
//! `Db::generate_id`, which is monotonic across restarts, so key order is
//! enqueue order. Each value records when the message was queued.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sled::{Db, Tree};
use tracing::warn;

use crate::client::outbound::OutboundMessage;
use crate::utils::error::{PubSubError, Result};

const OUTBOUND_TREE: &str = "outbound";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StoredMessage {
    pub channel: String,
    pub data: Value,
    pub queued_at: i64,
}

impl From<StoredMessage> for OutboundMessage {
    fn from(stored: StoredMessage) -> Self {
        OutboundMessage::new(stored.channel, stored.data)
    }
}

#[derive(Clone)]
pub struct OutboundStore {
    db: Db,
    tree: Tree,
}

impl OutboundStore {
    /// Open or create the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        let tree = db.open_tree(OUTBOUND_TREE)?;
        Ok(Self { db, tree })
    }

    /// Append a message after everything already stored.
    pub fn append(&self, message: &OutboundMessage) -> Result<()> {
        let stored = StoredMessage {
            channel: message.channel.clone(),
            data: message.data.clone(),
            queued_at: Utc::now().timestamp_millis(),
        };
        let serialized =
            serde_json::to_vec(&stored).map_err(|e| PubSubError::Persistence(e.to_string()))?;

        let key = self.db.generate_id()?.to_be_bytes();
        self.tree.insert(key, serialized)?;
        self.tree.flush()?;
        Ok(())
    }

    /// Every stored message, oldest first. Undecodable entries are skipped.
    pub fn load_all(&self) -> Result<Vec<OutboundMessage>> {
        let mut messages = Vec::with_capacity(self.tree.len());
        for entry in self.tree.iter() {
            let (key, value) = entry?;
            match serde_json::from_slice::<StoredMessage>(&value) {
                Ok(stored) => messages.push(stored.into()),
                Err(e) => warn!("Skipping undecodable outbound entry {key:?}: {e}"),
            }
        }
        Ok(messages)
    }

    /// Remove the `count` oldest entries.
    pub fn remove_first(&self, count: usize) -> Result<()> {
        let keys: Vec<_> = self
            .tree
            .iter()
            .keys()
            .take(count)
            .collect::<std::result::Result<_, _>>()?;

        for key in keys {
            self.tree.remove(key)?;
        }
        self.tree.flush()?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.tree.clear()?;
        self.tree.flush()?;
        Ok(())
    }

    /// Replace the stored contents with `messages`, in order.
    pub fn replace_all<'a, I>(&self, messages: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a OutboundMessage>,
    {
        self.tree.clear()?;
        for message in messages {
            self.append(message)?;
        }
        self.tree.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

impl std::fmt::Debug for OutboundStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundStore")
            .field("db", &"sled::Db")
            .field("entries", &self.tree.len())
            .finish()
    }
}
