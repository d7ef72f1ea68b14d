//! The `config` module loads client settings from an optional
//! `config/default` file and `PUBSUB_*` environment variables, falling back
//! to defaults for anything left unset.
//!
//! Environment keys use `__` between section and field, e.g.
//! `PUBSUB_ENDPOINT__BASE_URL` or `PUBSUB_RECONNECT__MAX_DELAY_MS`.

mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{ClientSettings, EndpointSettings, ReconnectSettings, Settings};

pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("PUBSUB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let default = Settings::default();

    let endpoint = partial.endpoint.as_ref();
    let client = partial.client.as_ref();
    let reconnect = partial.reconnect.as_ref();

    Ok(Settings {
        endpoint: EndpointSettings {
            base_url: endpoint
                .and_then(|e| e.base_url.clone())
                .unwrap_or(default.endpoint.base_url),
            api_key: endpoint
                .and_then(|e| e.api_key.clone())
                .unwrap_or(default.endpoint.api_key),
        },
        client: ClientSettings {
            max_queued_messages: client
                .and_then(|c| c.max_queued_messages)
                .or(default.client.max_queued_messages),
            queue_path: client
                .and_then(|c| c.queue_path.clone())
                .or(default.client.queue_path),
            log_level: client
                .and_then(|c| c.log_level.clone())
                .unwrap_or(default.client.log_level),
        },
        reconnect: ReconnectSettings {
            initial_delay_ms: reconnect
                .and_then(|r| r.initial_delay_ms)
                .unwrap_or(default.reconnect.initial_delay_ms),
            max_delay_ms: reconnect
                .and_then(|r| r.max_delay_ms)
                .unwrap_or(default.reconnect.max_delay_ms),
            max_attempts: reconnect
                .and_then(|r| r.max_attempts)
                .or(default.reconnect.max_attempts),
        },
    })
}
