//! Endpoint API client (watcher → Hookstorm backend).

use async_trait::async_trait;
use reqwest::Client;
use url::Url;
use urlencoding::encode;

use super::{ClientError, EndpointApi, StatusPolicy, check_status, parse_response};
use crate::normalize::into_normalized;
use crate::objects::{
    CreateEndpointRequest, Endpoint, Event, ReplayEventRequest, ReplayOutcome, validate_target_url,
};

/// Typed HTTP client for the Hookstorm **endpoint API**.
///
/// Requests are unauthenticated JSON. Responses are normalized from
/// snake_case before deserialization.
#[derive(Debug, Clone)]
pub struct HookstormClient {
    http: Client,
    base_url: Url,
}

impl HookstormClient {
    /// Create a new `HookstormClient`.
    ///
    /// * `base_url` – root URL of the backend (e.g. `http://127.0.0.1:8080`).
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST /api/endpoints` – issue a new endpoint.
    pub async fn create_endpoint(
        &self,
        request: &CreateEndpointRequest,
    ) -> Result<Endpoint, ClientError> {
        let url = self.base_url.join("/api/endpoints")?;

        let resp = self.http.post(url).json(request).send().await?;

        parse_response(resp, StatusPolicy::Generic).await
    }

    /// `GET /api/endpoints/{id}` – fetch an endpoint.
    pub async fn get_endpoint(&self, id: &str) -> Result<Endpoint, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/endpoints/{}", encode(id)))?;

        let resp = self.http.get(url).send().await?;

        parse_response(resp, StatusPolicy::EndpointScoped).await
    }

    /// `GET /api/endpoints/{id}/events` – list recorded events, oldest
    /// first.
    pub async fn get_events(&self, endpoint_id: &str) -> Result<Vec<Event>, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/endpoints/{}/events", encode(endpoint_id)))?;

        let resp = self.http.get(url).send().await?;

        parse_response(resp, StatusPolicy::EndpointScoped).await
    }

    /// `POST /api/endpoints/{id}/events/{event_id}/replay` – forward an
    /// event to `target_url`.
    ///
    /// Fails with [`ClientError::InvalidTargetUrl`] before sending anything
    /// if the target is not an absolute http(s) URL.
    pub async fn replay_event(
        &self,
        endpoint_id: &str,
        event_id: &str,
        target_url: &str,
    ) -> Result<ReplayOutcome, ClientError> {
        validate_target_url(target_url)?;

        let url = self.base_url.join(&format!(
            "/api/endpoints/{}/events/{}/replay",
            encode(endpoint_id),
            encode(event_id)
        ))?;

        let body = ReplayEventRequest {
            target_url: target_url.trim().to_owned(),
        };
        let resp = self.http.post(url).json(&body).send().await?;

        let resp = check_status(resp, StatusPolicy::EndpointScoped).await?;
        let bytes = resp.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(ReplayOutcome::accepted());
        }
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        serde_json::from_value(into_normalized(value)).map_err(ClientError::Json)
    }
}

#[async_trait]
impl EndpointApi for HookstormClient {
    async fn create_endpoint(
        &self,
        request: &CreateEndpointRequest,
    ) -> Result<Endpoint, ClientError> {
        HookstormClient::create_endpoint(self, request).await
    }

    async fn get_endpoint(&self, id: &str) -> Result<Endpoint, ClientError> {
        HookstormClient::get_endpoint(self, id).await
    }

    async fn get_events(&self, endpoint_id: &str) -> Result<Vec<Event>, ClientError> {
        HookstormClient::get_events(self, endpoint_id).await
    }

    async fn replay_event(
        &self,
        endpoint_id: &str,
        event_id: &str,
        target_url: &str,
    ) -> Result<ReplayOutcome, ClientError> {
        HookstormClient::replay_event(self, endpoint_id, event_id, target_url).await
    }
}
