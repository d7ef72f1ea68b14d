//! Wire frames exchanged with the pub/sub service.
//!
//! Every frame is a single-line JSON object:
//! - `{"action":"sub","channel":"<name>"}`
//! - `{"action":"unsub","channel":"<name>"}`
//! - `{"action":"pub","channel":"<name>","data":<json>}`
//! - inbound: `{"channel":"<name>","data":<json>}`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::error::{PubSubError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientFrame {
    Sub { channel: String },
    Unsub { channel: String },
    Pub { channel: String, data: Value },
}

impl ClientFrame {
    pub fn to_text(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| PubSubError::MalformedMessage(e.to_string()))
    }
}

/// A message delivered by the service for a subscribed channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub channel: String,
    pub data: Value,
}

impl Delivery {
    pub fn parse(text: &str) -> Result<Self> {
        let delivery: Delivery = serde_json::from_str(text).map_err(|e| {
            PubSubError::MalformedMessage(format!(
                "{e} | {}",
                text.chars().take(100).collect::<String>()
            ))
        })?;

        if delivery.channel.is_empty() {
            return Err(PubSubError::MalformedMessage(
                "delivery has an empty channel".to_string(),
            ));
        }

        Ok(delivery)
    }
}
