//! EventPoller processor.
//!
//! The EventPoller is responsible for:
//! - Refreshing the event list of the current endpoint on a fixed cadence
//! - Skipping a tick when no endpoint is known, when the previous tick is
//!   still out, or while a replay is in progress
//! - Asking the lifecycle for a renewal when the endpoint turns out to be
//!   expired or unknown
//! - Dropping late results once the shutdown signal has been observed
//!
//! Ticks arrive either from the interval driven by [`EventPoller::run`] or
//! out of band through [`EventPoller::refresh_now`].

use crate::lifecycle::{CreateOptions, EndpointLifecycle, Verification};
use hookstorm_sdk::client::ClientError;
use hookstorm_sdk::objects::{Endpoint, Event};
use kanau::processor::Processor;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Cadence of scheduled ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

// ---------------------------------------------------------------------------
// Public data types
// ---------------------------------------------------------------------------

/// What triggered a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTick {
    /// Emitted by the interval.
    Scheduled,
    /// Out-of-band refresh, e.g. right after a replay.
    Immediate,
}

/// Why a tick did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoEndpoint,
    /// The previous tick has not finished yet.
    InFlight,
    Replaying,
    /// The endpoint changed while the events were being fetched.
    Superseded,
}

/// Result of a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Refreshed { count: usize },
    Renewed { endpoint_id: String },
    Skipped(SkipReason),
    /// Logged and otherwise ignored; the next tick tries again.
    Failed,
    /// Shutdown was observed mid-tick; nothing was applied.
    Cancelled,
}

// ---------------------------------------------------------------------------
// EventPoller
// ---------------------------------------------------------------------------

struct PollerInner {
    lifecycle: EndpointLifecycle,
    interval: Duration,
    polling: AtomicBool,
    replaying: Mutex<Option<String>>,
    events: watch::Sender<Arc<Vec<Event>>>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Keeps the event list of the current endpoint fresh.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct EventPoller {
    inner: Arc<PollerInner>,
}

impl EventPoller {
    /// Create a new EventPoller.
    ///
    /// # Arguments
    ///
    /// * `lifecycle` - Source of the current endpoint
    /// * `interval` - Cadence of scheduled ticks
    /// * `shutdown_rx` - Teardown signal; once it reads `true` no tick
    ///   applies any further state
    pub fn new(
        lifecycle: EndpointLifecycle,
        interval: Duration,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let (events, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Arc::new(PollerInner {
                lifecycle,
                interval,
                polling: AtomicBool::new(false),
                replaying: Mutex::new(None),
                events,
                shutdown_rx,
            }),
        }
    }

    pub fn lifecycle(&self) -> &EndpointLifecycle {
        &self.inner.lifecycle
    }

    /// Latest event list, oldest first as returned by the backend.
    pub fn events(&self) -> Arc<Vec<Event>> {
        self.inner.events.borrow().clone()
    }

    pub fn subscribe_events(&self) -> watch::Receiver<Arc<Vec<Event>>> {
        self.inner.events.subscribe()
    }

    /// Id of the event currently being replayed.
    pub fn replaying_event(&self) -> Option<String> {
        lock(&self.inner.replaying).clone()
    }

    pub fn is_replaying(&self, event_id: &str) -> bool {
        lock(&self.inner.replaying).as_deref() == Some(event_id)
    }

    /// Run the scheduled ticks until shutdown is signaled.
    ///
    /// The first tick fires one interval after start. Each tick runs in its
    /// own task, so a tick that is still out when the next one fires makes
    /// that one skip instead of delaying it.
    pub async fn run(self) {
        let mut shutdown_rx = self.inner.shutdown_rx.clone();
        if *shutdown_rx.borrow_and_update() {
            return;
        }

        let mut interval = tokio::time::interval(self.inner.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval.tick().await;

        info!(interval_ms = self.inner.interval.as_millis(), "EventPoller started");

        let mut outstanding: Vec<JoinHandle<()>> = Vec::new();
        loop {
            tokio::select! {
                biased;

                // Shutdown has highest priority.
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("EventPoller received shutdown signal");
                        break;
                    }
                }

                _ = interval.tick() => {
                    outstanding.retain(|handle| !handle.is_finished());
                    let poller = self.clone();
                    outstanding.push(tokio::spawn(async move {
                        let outcome = poller.tick(PollTick::Scheduled).await;
                        debug!(?outcome, "Scheduled tick finished");
                    }));
                }
            }
        }

        for handle in outstanding {
            handle.abort();
        }

        info!("EventPoller shutdown complete");
    }

    /// Refresh outside the cadence. Follows the same skip rules.
    pub async fn refresh_now(&self) -> TickOutcome {
        self.tick(PollTick::Immediate).await
    }

    /// Mark `event_id` as being replayed.
    ///
    /// Returns `None` while another replay holds the marker. Ticks skip
    /// until the returned guard is dropped.
    pub(crate) fn begin_replay(&self, event_id: &str) -> Option<ReplayGuard> {
        let mut slot = lock(&self.inner.replaying);
        if slot.is_some() {
            return None;
        }
        *slot = Some(event_id.to_owned());
        Some(ReplayGuard {
            inner: self.inner.clone(),
        })
    }

    // -- Private helpers ----------------------------------------------------

    fn is_alive(&self) -> bool {
        !*self.inner.shutdown_rx.borrow()
    }

    async fn tick(&self, kind: PollTick) -> TickOutcome {
        if !self.is_alive() {
            return TickOutcome::Cancelled;
        }
        if let Some(event_id) = self.replaying_event() {
            debug!(?kind, %event_id, "Replay in progress, skipping tick");
            return TickOutcome::Skipped(SkipReason::Replaying);
        }
        let Some(endpoint) = self.inner.lifecycle.current() else {
            debug!(?kind, "No endpoint yet, skipping tick");
            return TickOutcome::Skipped(SkipReason::NoEndpoint);
        };
        let Some(_polling) = PollingGuard::acquire(&self.inner.polling) else {
            debug!(?kind, "Previous tick still in flight, skipping");
            return TickOutcome::Skipped(SkipReason::InFlight);
        };

        // Classify first and adopt the result only while still alive.
        let verification = self.inner.lifecycle.classify(&endpoint).await;
        if !self.is_alive() {
            return TickOutcome::Cancelled;
        }

        match verification {
            Ok(Verification::Valid(verified)) => {
                self.inner.lifecycle.accept_verified(&verified).await;
            }
            Ok(Verification::Gone(reason)) => {
                info!(endpoint_id = %endpoint.id, ?reason, "Endpoint gone, renewing");
                return self.renew(&endpoint).await;
            }
            Err(e) => {
                warn!(endpoint_id = %endpoint.id, error = %e, "Failed to verify endpoint");
                return TickOutcome::Failed;
            }
        }

        let fetched = self.inner.lifecycle.api().get_events(&endpoint.id).await;
        if !self.is_alive() {
            return TickOutcome::Cancelled;
        }

        match fetched {
            Ok(events) => {
                let still_current = self
                    .inner
                    .lifecycle
                    .current()
                    .is_some_and(|current| current.id == endpoint.id);
                if !still_current {
                    debug!(endpoint_id = %endpoint.id, "Endpoint replaced during fetch, dropping events");
                    return TickOutcome::Skipped(SkipReason::Superseded);
                }

                let count = events.len();
                self.inner.events.send_replace(Arc::new(events));
                debug!(endpoint_id = %endpoint.id, count, ?kind, "Events refreshed");
                TickOutcome::Refreshed { count }
            }
            Err(e @ (ClientError::EndpointExpired | ClientError::EndpointNotFound)) => {
                info!(endpoint_id = %endpoint.id, error = %e, "Endpoint gone while fetching events, renewing");
                self.renew(&endpoint).await
            }
            Err(e) => {
                warn!(endpoint_id = %endpoint.id, error = %e, "Error refreshing events");
                TickOutcome::Failed
            }
        }
    }

    async fn renew(&self, stale: &Endpoint) -> TickOutcome {
        let renewed = self
            .inner
            .lifecycle
            .create_new_endpoint(CreateOptions::renewal(stale.id.clone()))
            .await;
        if !self.is_alive() {
            return TickOutcome::Cancelled;
        }

        match renewed {
            Ok(endpoint) => {
                self.inner.events.send_replace(Arc::new(Vec::new()));
                TickOutcome::Renewed {
                    endpoint_id: endpoint.id,
                }
            }
            Err(e) => {
                warn!(stale_id = %stale.id, error = %e, "Renewal failed");
                TickOutcome::Failed
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

struct PollingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PollingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for PollingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Holds the replay marker; released on drop.
pub(crate) struct ReplayGuard {
    inner: Arc<PollerInner>,
}

impl Drop for ReplayGuard {
    fn drop(&mut self) {
        *lock(&self.inner.replaying) = None;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Processor trait implementation
// ---------------------------------------------------------------------------

impl Processor<PollTick> for EventPoller {
    type Output = TickOutcome;
    type Error = Infallible;

    async fn process(&self, tick: PollTick) -> Result<TickOutcome, Infallible> {
        Ok(self.tick(tick).await)
    }
}
