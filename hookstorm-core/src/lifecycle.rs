//! Endpoint lifecycle.
//!
//! `EndpointLifecycle` owns "the current endpoint" for a client session:
//! - Restoring it from storage and re-verifying it against the backend
//! - Creating a replacement when it is missing, expired or unknown
//! - Collapsing concurrent creations into a single backend request
//! - Publishing the current endpoint to observers through a `watch` channel
//!
//! Build one per session and hand out clones; all clones share state.

use crate::notify::{Notification, Notifier};
use crate::storage::{KeyValueStore, PersistedEndpoint, StorageError};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use hookstorm_sdk::client::{ClientError, EndpointApi};
use hookstorm_sdk::objects::{CreateEndpointRequest, Endpoint};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Display name used for endpoints created by this client.
pub const DEFAULT_ENDPOINT_NAME: &str = "Webhook Endpoint";

// ---------------------------------------------------------------------------
// Public data types
// ---------------------------------------------------------------------------

/// Errors surfaced by the lifecycle.
///
/// Cloneable because a single creation result is handed to every caller
/// that joined it.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    #[error("failed to create endpoint: {0}")]
    Create(Arc<ClientError>),

    #[error("failed to verify endpoint: {0}")]
    Verify(Arc<ClientError>),

    #[error("endpoint storage error: {0}")]
    Storage(Arc<StorageError>),
}

impl From<StorageError> for LifecycleError {
    fn from(e: StorageError) -> Self {
        LifecycleError::Storage(Arc::new(e))
    }
}

/// Why an endpoint can no longer be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoneReason {
    Expired,
    NotFound,
}

/// Result of checking an endpoint against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid(Endpoint),
    Gone(GoneReason),
}

/// Callback run with the endpoint after a successful creation.
pub type SuccessCallback = Arc<dyn Fn(&Endpoint) + Send + Sync>;

/// Options for [`EndpointLifecycle::create_new_endpoint`].
#[derive(Clone, Default)]
pub struct CreateOptions {
    /// First endpoint of the session: notifies "created" rather than
    /// "renewed", and "create failed" rather than "renew failed".
    pub initial: bool,
    /// Emit notifications for this creation.
    pub notify: bool,
    /// Id of the stale endpoint this creation replaces. If the current
    /// endpoint is already a different one, it is returned instead.
    pub replaces: Option<String>,
    pub on_success: Option<SuccessCallback>,
}

impl CreateOptions {
    pub fn initial() -> Self {
        Self {
            initial: true,
            notify: true,
            ..Self::default()
        }
    }

    pub fn renewal(stale_id: impl Into<String>) -> Self {
        Self {
            initial: false,
            notify: true,
            replaces: Some(stale_id.into()),
            on_success: None,
        }
    }

    pub fn with_notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    pub fn on_success(mut self, callback: impl Fn(&Endpoint) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }
}

/// Parameters sent with every creation request.
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub endpoint_name: String,
    pub ttl: Option<std::time::Duration>,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            endpoint_name: DEFAULT_ENDPOINT_NAME.to_owned(),
            ttl: None,
        }
    }
}

// ---------------------------------------------------------------------------
// EndpointLifecycle
// ---------------------------------------------------------------------------

type CreationFuture = Shared<BoxFuture<'static, Result<Endpoint, LifecycleError>>>;

struct InFlight {
    generation: u64,
    future: CreationFuture,
}

struct LifecycleInner {
    api: Arc<dyn EndpointApi>,
    persisted: PersistedEndpoint,
    notifier: Arc<dyn Notifier>,
    settings: LifecycleSettings,
    /// At most one creation exists at a time. Only touched synchronously,
    /// never across an await.
    in_flight: Mutex<Option<InFlight>>,
    generation: AtomicU64,
    current: watch::Sender<Option<Endpoint>>,
}

/// Single source of truth for the session's endpoint.
#[derive(Clone)]
pub struct EndpointLifecycle {
    inner: Arc<LifecycleInner>,
}

impl EndpointLifecycle {
    pub fn new(
        api: Arc<dyn EndpointApi>,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        settings: LifecycleSettings,
    ) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            inner: Arc::new(LifecycleInner {
                api,
                persisted: PersistedEndpoint::new(store),
                notifier,
                settings,
                in_flight: Mutex::new(None),
                generation: AtomicU64::new(0),
                current,
            }),
        }
    }

    /// The gateway this lifecycle talks to.
    pub fn api(&self) -> &Arc<dyn EndpointApi> {
        &self.inner.api
    }

    /// The endpoint currently in use, if one has been established.
    pub fn current(&self) -> Option<Endpoint> {
        self.inner.current.borrow().clone()
    }

    /// Watch the current endpoint.
    pub fn subscribe(&self) -> watch::Receiver<Option<Endpoint>> {
        self.inner.current.subscribe()
    }

    /// Whether a creation request is outstanding.
    pub fn is_creating(&self) -> bool {
        lock(&self.inner.in_flight).is_some()
    }

    /// Return an endpoint that the backend has just confirmed, creating
    /// one if needed.
    ///
    /// 1. A creation already in flight is joined, also one that started
    ///    while storage was being read.
    /// 2. Nothing stored and nothing current: an initial creation is
    ///    started. An unreadable record counts as nothing stored.
    /// 3. Otherwise the stored (or else current) endpoint is verified.
    ///    Expired or unknown endpoints are cleared and replaced; any other
    ///    failure is returned.
    pub async fn get_valid_endpoint(&self, notify: bool) -> Result<Endpoint, LifecycleError> {
        if let Some(flight) = self.joinable_flight() {
            debug!("Creation in flight, joining it");
            return flight.await;
        }

        let stored = match self.inner.persisted.load().await {
            Ok(stored) => stored,
            Err(StorageError::Corrupt(e)) => {
                warn!(error = %e, "Stored endpoint is corrupt, discarding it");
                if notify {
                    self.inner.notifier.notify(Notification::StorageCorrupt);
                }
                if let Err(e) = self.inner.persisted.clear().await {
                    warn!(error = %e, "Failed to clear corrupt endpoint record");
                }
                None
            }
            Err(e) => return Err(e.into()),
        };

        // Storage was read across a suspension point; a creation may have
        // started or finished in the meantime.
        if let Some(flight) = self.joinable_flight() {
            debug!("Creation started while reading storage, joining it");
            return flight.await;
        }
        let Some(stored) = stored.or_else(|| self.current()) else {
            debug!("No stored endpoint, creating one");
            return self
                .create_new_endpoint(CreateOptions::initial().with_notify(notify))
                .await;
        };

        match self.verify(&stored).await? {
            Verification::Valid(endpoint) => Ok(endpoint),
            Verification::Gone(reason) => {
                info!(endpoint_id = %stored.id, ?reason, "Stored endpoint is gone, replacing it");
                if let Err(e) = self.inner.persisted.clear_if(&stored.id).await {
                    warn!(error = %e, "Failed to clear stale endpoint record");
                }
                let options = CreateOptions {
                    initial: self.current().is_none(),
                    notify,
                    replaces: Some(stored.id),
                    on_success: None,
                };
                self.create_new_endpoint(options).await
            }
        }
    }

    /// Create a new endpoint, or join the creation already in flight.
    ///
    /// However many callers arrive concurrently, at most one creation
    /// request reaches the backend and every caller receives its result.
    /// The options of the caller that started the request decide which
    /// notifications are emitted; `on_success` runs for each caller.
    pub async fn create_new_endpoint(
        &self,
        options: CreateOptions,
    ) -> Result<Endpoint, LifecycleError> {
        let flight = {
            let mut slot = lock(&self.inner.in_flight);
            match slot.as_ref() {
                Some(existing) => {
                    debug!(generation = existing.generation, "Joining in-flight creation");
                    existing.future.clone()
                }
                None => {
                    if let Some(current) = self.superseding(options.replaces.as_deref()) {
                        debug!(
                            endpoint_id = %current.id,
                            "Stale endpoint already replaced, skipping creation"
                        );
                        drop(slot);
                        run_callback(&options, &current);
                        return Ok(current);
                    }

                    let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
                    let future =
                        run_creation(self.inner.clone(), generation, options.initial, options.notify)
                            .boxed()
                            .shared();
                    *slot = Some(InFlight {
                        generation,
                        future: future.clone(),
                    });
                    future
                }
            }
        };

        let endpoint = flight.await?;
        run_callback(&options, &endpoint);
        Ok(endpoint)
    }

    /// Check `endpoint` against the backend and adopt the confirmed copy.
    ///
    /// Same as [`classify`](Self::classify) followed by
    /// [`accept_verified`](Self::accept_verified) on a valid result.
    pub async fn verify(&self, endpoint: &Endpoint) -> Result<Verification, LifecycleError> {
        let verification = self.classify(endpoint).await?;
        if let Verification::Valid(verified) = &verification {
            self.accept_verified(verified).await;
        }
        Ok(verification)
    }

    /// Check `endpoint` against the backend without touching any state.
    ///
    /// An endpoint past its `expires_at` is reported gone without a
    /// request. A confirmed endpoint keeps its stored `id` and
    /// `created_at`.
    pub async fn classify(&self, endpoint: &Endpoint) -> Result<Verification, LifecycleError> {
        if endpoint.is_expired_at(OffsetDateTime::now_utc()) {
            debug!(endpoint_id = %endpoint.id, "Endpoint is past its expiry time");
            return Ok(Verification::Gone(GoneReason::Expired));
        }

        let fresh = match self.inner.api.get_endpoint(&endpoint.id).await {
            Ok(fresh) => fresh,
            Err(ClientError::EndpointExpired) => return Ok(Verification::Gone(GoneReason::Expired)),
            Err(ClientError::EndpointNotFound) => {
                return Ok(Verification::Gone(GoneReason::NotFound));
            }
            Err(e) => return Err(LifecycleError::Verify(Arc::new(e))),
        };

        Ok(Verification::Valid(Endpoint {
            id: endpoint.id.clone(),
            created_at: endpoint.created_at,
            ..fresh
        }))
    }

    /// Publish and persist a copy confirmed by [`classify`](Self::classify).
    ///
    /// Ignored if a different endpoint has become current meanwhile.
    pub async fn accept_verified(&self, verified: &Endpoint) {
        let mut still_current = false;
        self.inner.current.send_if_modified(|current| match current {
            Some(c) if c.id != verified.id => false,
            Some(c) if *c == *verified => {
                still_current = true;
                false
            }
            _ => {
                still_current = true;
                *current = Some(verified.clone());
                true
            }
        });

        if still_current {
            if let Err(e) = self.inner.persisted.save(verified).await {
                warn!(endpoint_id = %verified.id, error = %e, "Failed to persist verified endpoint");
            }
        }
    }

    // -- Private helpers ----------------------------------------------------

    fn joinable_flight(&self) -> Option<CreationFuture> {
        lock(&self.inner.in_flight)
            .as_ref()
            .map(|flight| flight.future.clone())
    }

    /// The current endpoint, if it already differs from `stale_id`.
    fn superseding(&self, stale_id: Option<&str>) -> Option<Endpoint> {
        let stale_id = stale_id?;
        self.inner
            .current
            .borrow()
            .as_ref()
            .filter(|current| current.id != stale_id)
            .cloned()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run_callback(options: &CreateOptions, endpoint: &Endpoint) {
    if let Some(callback) = &options.on_success {
        callback(endpoint);
    }
}

/// Body of a single creation. Clears the in-flight marker when done,
/// whatever the outcome.
async fn run_creation(
    inner: Arc<LifecycleInner>,
    generation: u64,
    initial: bool,
    notify: bool,
) -> Result<Endpoint, LifecycleError> {
    let outcome = create_and_persist(&inner).await;

    match &outcome {
        Ok(endpoint) => {
            inner.current.send_replace(Some(endpoint.clone()));
            info!(
                endpoint_id = %endpoint.id,
                url = %endpoint.url,
                expires_at = %endpoint.expires_at,
                initial,
                "Endpoint created"
            );
            if notify {
                inner.notifier.notify(if initial {
                    Notification::EndpointCreated
                } else {
                    Notification::EndpointRenewed
                });
            }
        }
        Err(e) => {
            error!(error = %e, initial, "Endpoint creation failed");
            if let Err(e) = inner.persisted.clear().await {
                warn!(error = %e, "Failed to clear endpoint record after failed creation");
            }
            if notify {
                inner.notifier.notify(if initial {
                    Notification::EndpointCreateError
                } else {
                    Notification::EndpointError
                });
            }
        }
    }

    let mut slot = lock(&inner.in_flight);
    if slot.as_ref().is_some_and(|f| f.generation == generation) {
        *slot = None;
    }
    drop(slot);

    outcome
}

async fn create_and_persist(inner: &LifecycleInner) -> Result<Endpoint, LifecycleError> {
    let mut request = CreateEndpointRequest::new(inner.settings.endpoint_name.clone());
    if let Some(ttl) = inner.settings.ttl {
        request = request.with_ttl(ttl);
    }

    let endpoint = inner
        .api
        .create_endpoint(&request)
        .await
        .map_err(|e| LifecycleError::Create(Arc::new(e)))?;

    inner.persisted.save(&endpoint).await?;
    Ok(endpoint)
}
