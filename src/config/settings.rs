use serde::Deserialize;

use crate::transport::endpoint::EndpointInfo;

/// Top-level configuration settings for the client.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub endpoint: EndpointSettings,
    pub client: ClientSettings,
    pub reconnect: ReconnectSettings,
}

/// Where the backend lives and how to authenticate against it.
#[derive(Debug, Deserialize, Clone)]
pub struct EndpointSettings {
    pub base_url: String,
    pub api_key: String,
}

/// Local client behaviour.
///
/// `queue_path` enables the durable outbound queue; without it queued
/// publishes only live in memory.
#[derive(Debug, Deserialize, Clone)]
pub struct ClientSettings {
    pub max_queued_messages: Option<usize>,
    pub queue_path: Option<String>,
    pub log_level: String,
}

/// Backoff used by the WebSocket transport between connection attempts.
#[derive(Debug, Deserialize, Clone)]
pub struct ReconnectSettings {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: Option<usize>,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub endpoint: Option<PartialEndpointSettings>,
    pub client: Option<PartialClientSettings>,
    pub reconnect: Option<PartialReconnectSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialEndpointSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialClientSettings {
    pub max_queued_messages: Option<usize>,
    pub queue_path: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialReconnectSettings {
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub max_attempts: Option<usize>,
}

impl Settings {
    /// Connection target handed to `PubSubClient::configure`.
    pub fn endpoint_info(&self) -> EndpointInfo {
        EndpointInfo::new(&self.endpoint.base_url, &self.endpoint.api_key)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: EndpointSettings {
                base_url: "http://127.0.0.1:8080".to_string(),
                api_key: String::new(),
            },
            client: ClientSettings {
                max_queued_messages: None,
                queue_path: None,
                log_level: "info".to_string(),
            },
            reconnect: ReconnectSettings {
                initial_delay_ms: 500,
                max_delay_ms: 30_000,
                max_attempts: None,
            },
        }
    }
}
