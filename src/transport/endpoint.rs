//! Pub/sub endpoint derivation.
//!
//! The WebSocket URL is derived from the backend's HTTP(S) base URL:
//! `http` becomes `ws`, `https` becomes `wss`, the `pubsub` path segment is
//! appended and the API key travels as the `apiKey` query parameter.

use url::Url;

use crate::utils::error::{PubSubError, Result};

/// Path segment appended to the base URL.
pub const PUBSUB_PATH: &str = "pubsub";

/// Query parameter carrying the API key.
pub const API_KEY_PARAM: &str = "apiKey";

/// Connection target for the pub/sub client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    pub base_url: String,
    pub api_key: String,
}

impl EndpointInfo {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Build the WebSocket URL for this endpoint.
    ///
    /// Fails with `InvalidArgument` for unparsable URLs and for any scheme
    /// other than `http`/`https`.
    pub fn pubsub_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            PubSubError::InvalidArgument(format!("invalid endpoint url '{}': {e}", self.base_url))
        })?;

        let ws_scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => {
                return Err(PubSubError::InvalidArgument(format!(
                    "unsupported endpoint scheme '{other}', expected http or https"
                )));
            }
        };

        url.set_scheme(ws_scheme).map_err(|_| {
            PubSubError::InvalidArgument(format!("cannot switch '{}' to {ws_scheme}", self.base_url))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                PubSubError::InvalidArgument(format!("'{}' cannot be a base url", self.base_url))
            })?
            .pop_if_empty()
            .push(PUBSUB_PATH);

        url.query_pairs_mut().append_pair(API_KEY_PARAM, &self.api_key);
        url.set_fragment(None);

        Ok(url)
    }
}
