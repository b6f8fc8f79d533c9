//! Replay request and response types.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

/// `POST /api/endpoints/{id}/events/{event_id}/replay` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayEventRequest {
    pub target_url: String,
}

/// Result reported by the backend after forwarding an event.
///
/// A 2xx answer with an empty body is treated as a plain success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayOutcome {
    pub success: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub replayed_at: Option<OffsetDateTime>,
    /// Status code returned by the replay target.
    #[serde(default)]
    pub response_code: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ReplayOutcome {
    pub fn accepted() -> Self {
        Self {
            success: true,
            replayed_at: None,
            response_code: None,
            error: None,
        }
    }
}

/// The replay target is not an absolute http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid target url: {input:?}")]
pub struct InvalidTargetUrl {
    pub input: String,
}

/// Check a user-supplied replay target before anything is sent.
///
/// Surrounding whitespace is trimmed. The rest must parse as an absolute
/// URL with an `http` or `https` scheme and a host.
pub fn validate_target_url(raw: &str) -> Result<Url, InvalidTargetUrl> {
    let invalid = || InvalidTargetUrl {
        input: raw.to_owned(),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let url = Url::parse(trimmed).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }

    Ok(url)
}
