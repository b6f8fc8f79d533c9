//! HTTP client for the Hookstorm endpoint API.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

mod endpoints;

pub use endpoints::HookstormClient;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::normalize::into_normalized;
use crate::objects::{CreateEndpointRequest, Endpoint, Event, InvalidTargetUrl, ReplayOutcome};

/// Errors produced by the SDK HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint exists but its time-to-live has run out (HTTP 410).
    #[error("endpoint has expired")]
    EndpointExpired,

    /// The backend does not know the endpoint (HTTP 404).
    #[error("endpoint not found")]
    EndpointNotFound,

    /// Rejected locally; no request was sent.
    #[error(transparent)]
    InvalidTargetUrl(#[from] InvalidTargetUrl),

    /// The server returned any other non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// `true` for the two outcomes that mean "this endpoint is no longer
    /// usable": expired or not found.
    pub fn is_gone(&self) -> bool {
        matches!(self, ClientError::EndpointExpired | ClientError::EndpointNotFound)
    }
}

/// The four remote operations the client-side lifecycle depends on.
///
/// [`HookstormClient`] is the production implementation; the lifecycle
/// code only sees this trait.
#[async_trait]
pub trait EndpointApi: Send + Sync {
    /// Issue a new endpoint. Any non-2xx status is an [`ClientError::Api`].
    async fn create_endpoint(&self, request: &CreateEndpointRequest)
    -> Result<Endpoint, ClientError>;

    /// Fetch an endpoint by id.
    async fn get_endpoint(&self, id: &str) -> Result<Endpoint, ClientError>;

    /// Fetch every recorded event of an endpoint, oldest first.
    async fn get_events(&self, endpoint_id: &str) -> Result<Vec<Event>, ClientError>;

    /// Forward a recorded event to `target_url`.
    ///
    /// The URL is validated before any request is made.
    async fn replay_event(
        &self,
        endpoint_id: &str,
        event_id: &str,
        target_url: &str,
    ) -> Result<ReplayOutcome, ClientError>;
}

/// How a non-2xx status should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusPolicy {
    /// Every failure is an [`ClientError::Api`].
    Generic,
    /// 410 and 404 map to the endpoint-specific variants.
    EndpointScoped,
}

async fn check_status(
    resp: reqwest::Response,
    policy: StatusPolicy,
) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if policy == StatusPolicy::EndpointScoped {
        match status {
            StatusCode::GONE => return Err(ClientError::EndpointExpired),
            StatusCode::NOT_FOUND => return Err(ClientError::EndpointNotFound),
            _ => {}
        }
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::Api { status, body })
}

async fn parse_response<T: DeserializeOwned>(
    resp: reqwest::Response,
    policy: StatusPolicy,
) -> Result<T, ClientError> {
    let resp = check_status(resp, policy).await?;
    let bytes = resp.bytes().await?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)?;
    serde_json::from_value(into_normalized(value)).map_err(ClientError::Json)
}
