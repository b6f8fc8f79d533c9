//! In-memory test doubles for the gateway and the notification sink.

use async_trait::async_trait;
use hookstorm_sdk::client::{ClientError, EndpointApi};
use hookstorm_sdk::objects::{
    CreateEndpointRequest, Endpoint, EndpointStatus, Event, ReplayOutcome, validate_target_url,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::Notify;

use crate::notify::{Notification, Notifier};

pub(crate) fn endpoint(id: &str) -> Endpoint {
    let now = OffsetDateTime::now_utc();
    Endpoint {
        id: id.to_owned(),
        name: "Webhook Endpoint".to_owned(),
        url: format!("http://127.0.0.1:8080/hook/{id}"),
        created_at: now - time::Duration::hours(1),
        expires_at: now + time::Duration::hours(1),
        status: EndpointStatus::Active,
        event_count: 0,
    }
}

pub(crate) fn event(id: &str, replay_count: u64) -> Event {
    Event {
        id: id.to_owned(),
        endpoint_id: None,
        method: "POST".to_owned(),
        status_code: 200,
        headers: Default::default(),
        query_params: Default::default(),
        body: serde_json::json!({ "event": "test" }),
        received_at: OffsetDateTime::now_utc(),
        replay_count,
    }
}

/// Scriptable [`EndpointApi`] that counts every call.
#[derive(Default)]
pub(crate) struct MockApi {
    pub create_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub events_calls: AtomicUsize,
    pub replay_calls: AtomicUsize,
    pub fail_create: AtomicBool,
    pub fail_get: AtomicBool,
    pub reject_replay: AtomicBool,
    next_id: AtomicUsize,
    endpoints: Mutex<HashMap<String, Endpoint>>,
    expired: Mutex<HashSet<String>>,
    events: Mutex<Vec<Event>>,
    replay_gate: Mutex<Option<Arc<Notify>>>,
}

/// Keeps creations in flight long enough for concurrent callers to overlap.
const CREATE_DELAY: Duration = Duration::from_millis(10);

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register an endpoint the backend considers live.
    pub fn insert(&self, endpoint: Endpoint) {
        self.endpoints
            .lock()
            .unwrap()
            .insert(endpoint.id.clone(), endpoint);
    }

    /// Make the backend answer 410 for `id` from now on.
    pub fn expire(&self, id: &str) {
        self.expired.lock().unwrap().insert(id.to_owned());
    }

    pub fn set_events(&self, events: Vec<Event>) {
        *self.events.lock().unwrap() = events;
    }

    /// Hold every replay until the returned handle is notified.
    pub fn gate_replays(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.replay_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn network_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
            + self.get_calls.load(Ordering::SeqCst)
            + self.events_calls.load(Ordering::SeqCst)
            + self.replay_calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, id: &str) -> Result<Endpoint, ClientError> {
        if self.expired.lock().unwrap().contains(id) {
            return Err(ClientError::EndpointExpired);
        }
        self.endpoints
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or(ClientError::EndpointNotFound)
    }
}

fn unavailable() -> ClientError {
    ClientError::Json(serde_json::from_str::<serde_json::Value>("<html>").unwrap_err())
}

#[async_trait]
impl EndpointApi for MockApi {
    async fn create_endpoint(
        &self,
        request: &CreateEndpointRequest,
    ) -> Result<Endpoint, ClientError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(CREATE_DELAY).await;

        if self.fail_create.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut created = endpoint(&format!("ep-new-{n}"));
        created.name = request.name.clone();
        self.insert(created.clone());
        Ok(created)
    }

    async fn get_endpoint(&self, id: &str) -> Result<Endpoint, ClientError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.lookup(id)
    }

    async fn get_events(&self, endpoint_id: &str) -> Result<Vec<Event>, ClientError> {
        self.events_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.lookup(endpoint_id)?;
        Ok(self.events.lock().unwrap().clone())
    }

    async fn replay_event(
        &self,
        endpoint_id: &str,
        event_id: &str,
        target_url: &str,
    ) -> Result<ReplayOutcome, ClientError> {
        validate_target_url(target_url)?;
        self.replay_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.replay_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.lookup(endpoint_id)?;

        if self.reject_replay.load(Ordering::SeqCst) {
            return Ok(ReplayOutcome {
                success: false,
                replayed_at: None,
                response_code: Some(502),
                error: Some("bad gateway".to_owned()),
            });
        }
        for event in self.events.lock().unwrap().iter_mut() {
            if event.id == event_id {
                event.replay_count += 1;
            }
        }
        Ok(ReplayOutcome::accepted())
    }
}

/// Keeps every notification it receives.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}
