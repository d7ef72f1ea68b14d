use super::endpoint::EndpointInfo;
use super::message::{ClientFrame, Delivery};
use super::reconnect::ExponentialBackoff;
use crate::utils::error::PubSubError;
use serde_json::json;
use std::time::Duration;

#[test]
fn test_http_endpoint_becomes_ws() {
    let info = EndpointInfo::new("http://localhost:8080", "key123");
    let url = info.pubsub_url().unwrap();
    assert_eq!(url.as_str(), "ws://localhost:8080/pubsub?apiKey=key123");
}

#[test]
fn test_https_endpoint_becomes_wss_and_keeps_base_path() {
    let info = EndpointInfo::new("https://api.example.com/v2/", "k");
    let url = info.pubsub_url().unwrap();
    assert_eq!(url.scheme(), "wss");
    assert_eq!(url.path(), "/v2/pubsub");
    assert_eq!(url.query(), Some("apiKey=k"));
}

#[test]
fn test_api_key_is_query_encoded() {
    let info = EndpointInfo::new("https://api.example.com", "a b&c");
    let url = info.pubsub_url().unwrap();
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(pairs, vec![("apiKey".to_string(), "a b&c".to_string())]);
}

#[test]
fn test_unsupported_scheme_is_rejected() {
    for base in ["ftp://files.example.com", "ws://already.example.com", "file:///tmp/x"] {
        let err = EndpointInfo::new(base, "k").pubsub_url().unwrap_err();
        assert!(
            matches!(err, PubSubError::InvalidArgument(_)),
            "{base} should be rejected, got {err:?}"
        );
    }
}

#[test]
fn test_unparsable_url_is_rejected() {
    let err = EndpointInfo::new("not a url", "k").pubsub_url().unwrap_err();
    assert!(matches!(err, PubSubError::InvalidArgument(_)));
}

#[test]
fn test_client_frames_match_wire_format() {
    let sub = ClientFrame::Sub {
        channel: "news".to_string(),
    };
    assert_eq!(sub.to_text().unwrap(), r#"{"action":"sub","channel":"news"}"#);

    let unsub = ClientFrame::Unsub {
        channel: "news".to_string(),
    };
    assert_eq!(unsub.to_text().unwrap(), r#"{"action":"unsub","channel":"news"}"#);

    let publish = ClientFrame::Pub {
        channel: "news".to_string(),
        data: json!({"msg": "a"}),
    };
    assert_eq!(
        publish.to_text().unwrap(),
        r#"{"action":"pub","channel":"news","data":{"msg":"a"}}"#
    );
}

#[test]
fn test_delivery_parse() {
    let delivery = Delivery::parse(r#"{"channel":"chat","data":[1,2,3]}"#).unwrap();
    assert_eq!(delivery.channel, "chat");
    assert_eq!(delivery.data, json!([1, 2, 3]));
}

#[test]
fn test_delivery_parse_rejects_bad_input() {
    for text in [
        "not json",
        r#"{"data":1}"#,
        r#"{"channel":"chat"}"#,
        r#"{"channel":"","data":1}"#,
        r#"{"channel":7,"data":1}"#,
        "[]",
    ] {
        let err = Delivery::parse(text).unwrap_err();
        assert!(
            matches!(err, PubSubError::MalformedMessage(_)),
            "{text} should be malformed, got {err:?}"
        );
    }
}

#[test]
fn test_exponential_backoff_doubles_and_caps() {
    let backoff = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_millis(500), None);
    assert_eq!(backoff.next_delay(0), Some(Duration::from_millis(100)));
    assert_eq!(backoff.next_delay(1), Some(Duration::from_millis(200)));
    assert_eq!(backoff.next_delay(2), Some(Duration::from_millis(400)));
    assert_eq!(backoff.next_delay(3), Some(Duration::from_millis(500)));
    assert_eq!(backoff.next_delay(64), Some(Duration::from_millis(500)));
}

#[test]
fn test_exponential_backoff_respects_max_attempts() {
    let backoff = ExponentialBackoff::new(Duration::from_millis(10), Duration::from_secs(1), Some(2));
    assert!(backoff.next_delay(0).is_some());
    assert!(backoff.next_delay(1).is_some());
    assert_eq!(backoff.next_delay(2), None);
}

#[test]
fn test_backoff_from_settings() {
    let settings = crate::config::Settings::default();
    let backoff = ExponentialBackoff::from(&settings.reconnect);
    assert_eq!(backoff.next_delay(0), Some(Duration::from_millis(500)));
    assert_eq!(backoff.next_delay(10), Some(Duration::from_secs(30)));
}
