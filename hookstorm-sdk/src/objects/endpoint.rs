//! Endpoint objects.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A disposable receiving URL issued by the backend.
///
/// This is the normalized (camelCase) form. The same shape is what gets
/// persisted locally, so a stored copy can be read back without going
/// through the normalizer again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    #[serde(default)]
    pub status: EndpointStatus,
    #[serde(default)]
    pub event_count: u64,
}

impl Endpoint {
    /// Whether the endpoint has passed its expiry time at `now`.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// Time left until expiry, clamped at zero.
    pub fn time_remaining(&self, now: OffsetDateTime) -> time::Duration {
        (self.expires_at - now).max(time::Duration::ZERO)
    }
}

/// Endpoint status.
///
/// The backend does not always send it; a missing status means the
/// endpoint is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    #[default]
    Active,
    Deleted,
}

impl std::fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointStatus::Active => write!(f, "active"),
            EndpointStatus::Deleted => write!(f, "deleted"),
        }
    }
}

/// `POST /api/endpoints` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEndpointRequest {
    pub name: String,
    /// Overrides the server's default time-to-live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
}

impl CreateEndpointRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ttl_seconds: None,
        }
    }

    pub fn with_ttl(mut self, ttl: std::time::Duration) -> Self {
        self.ttl_seconds = Some(ttl.as_secs());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::into_normalized;
    use time::macros::datetime;

    const WIRE: &str = r#"{
        "id": "3f1c",
        "name": "Webhook Endpoint",
        "created_at": "2026-10-17T10:00:00.123456789Z",
        "expires_at": "2026-10-18T10:00:00Z",
        "event_count": 4,
        "url": "http://127.0.0.1:8080/hook/3f1c"
    }"#;

    fn wire_endpoint() -> Endpoint {
        let value: serde_json::Value = serde_json::from_str(WIRE).unwrap();
        serde_json::from_value(into_normalized(value)).unwrap()
    }

    #[test]
    fn test_parse_normalized_wire_body() {
        let endpoint = wire_endpoint();
        assert_eq!(endpoint.id, "3f1c");
        assert_eq!(endpoint.event_count, 4);
        assert_eq!(endpoint.status, EndpointStatus::Active);
        assert_eq!(endpoint.expires_at, datetime!(2026-10-18 10:00:00 UTC));
        assert!(endpoint.expires_at > endpoint.created_at);
    }

    #[test]
    fn test_persisted_form_reads_back() {
        let endpoint = wire_endpoint();
        let stored = serde_json::to_string(&endpoint).unwrap();
        assert!(stored.contains("\"expiresAt\""));
        let restored: Endpoint = serde_json::from_str(&stored).unwrap();
        assert_eq!(restored, endpoint);
    }

    #[test]
    fn test_expiry_helpers() {
        let endpoint = wire_endpoint();
        let before = datetime!(2026-10-18 09:59:00 UTC);
        let after = datetime!(2026-10-18 10:00:01 UTC);

        assert!(!endpoint.is_expired_at(before));
        assert!(endpoint.is_expired_at(endpoint.expires_at));
        assert!(endpoint.is_expired_at(after));
        assert_eq!(endpoint.time_remaining(before), time::Duration::minutes(1));
        assert_eq!(endpoint.time_remaining(after), time::Duration::ZERO);
    }

    #[test]
    fn test_create_request_omits_missing_ttl() {
        let body = serde_json::to_value(CreateEndpointRequest::new("hook")).unwrap();
        assert_eq!(body, serde_json::json!({ "name": "hook" }));

        let body = serde_json::to_value(
            CreateEndpointRequest::new("hook").with_ttl(std::time::Duration::from_secs(600)),
        )
        .unwrap();
        assert_eq!(body, serde_json::json!({ "name": "hook", "ttl_seconds": 600 }));
    }
}
