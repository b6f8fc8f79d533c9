//! Recorded webhook deliveries.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// One delivery recorded by an endpoint.
///
/// Events are never edited on the client. The backend bumps
/// `replay_count` and the client picks it up on the next full fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<String>,
    pub method: String,
    #[serde(default = "default_status_code")]
    pub status_code: u16,
    #[serde(default, deserialize_with = "deserialize_headers")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query_params: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub body: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub received_at: OffsetDateTime,
    #[serde(default)]
    pub replay_count: u64,
}

impl Event {
    /// The `event` field of a JSON object body, which most senders use to
    /// name the delivery.
    pub fn event_name(&self) -> Option<&str> {
        self.body.get("event").and_then(serde_json::Value::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

// The receiver answers every accepted delivery with 200.
fn default_status_code() -> u16 {
    200
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HeaderValue {
    One(String),
    Many(Vec<String>),
}

/// Headers arrive either flat or as the multi-valued form the receiver
/// records (`{"Accept": ["a", "b"]}`); multiple values are joined.
fn deserialize_headers<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, HeaderValue>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                HeaderValue::One(v) => v,
                HeaderValue::Many(vs) => vs.join(", "),
            };
            (name, value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::into_normalized;
    use serde_json::json;

    fn parse(wire: serde_json::Value) -> Vec<Event> {
        serde_json::from_value(into_normalized(wire)).unwrap()
    }

    #[test]
    fn test_parse_receiver_event_list() {
        let events = parse(json!([
            {
                "id": "e1",
                "endpoint_id": "3f1c",
                "received_at": "2026-10-17T10:00:00Z",
                "headers": { "Content-Type": ["application/json"], "Accept": ["a", "b"] },
                "query_params": { "page": ["1"] },
                "body": { "event": "order.paid", "order_id": 7 },
                "method": "POST",
                "replay_count": 2
            },
            {
                "id": "e2",
                "received_at": "2026-10-17T10:00:05Z",
                "headers": { "Content-Type": "text/plain" },
                "method": "PUT",
                "status_code": 500
            }
        ]));

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "e1");
        assert_eq!(events[0].endpoint_id.as_deref(), Some("3f1c"));
        assert_eq!(events[0].status_code, 200);
        assert_eq!(events[0].headers["Accept"], "a, b");
        assert_eq!(events[0].headers["Content-Type"], "application/json");
        assert_eq!(events[0].replay_count, 2);
        assert_eq!(events[0].event_name(), Some("order.paid"));
        // Body keys go through the normalizer too.
        assert_eq!(events[0].body["orderId"], 7);

        assert_eq!(events[1].status_code, 500);
        assert!(!events[1].is_success());
        assert_eq!(events[1].body, serde_json::Value::Null);
        assert_eq!(events[1].replay_count, 0);
        assert_eq!(events[1].event_name(), None);
    }

    #[test]
    fn test_null_headers() {
        let events = parse(json!([{
            "id": "e3",
            "received_at": "2026-10-17T10:00:00Z",
            "headers": null,
            "method": "GET"
        }]));
        assert!(events[0].headers.is_empty());
    }
}
