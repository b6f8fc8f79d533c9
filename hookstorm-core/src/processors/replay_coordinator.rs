//! ReplayCoordinator processor.
//!
//! Sends a single stored event to a caller-supplied target and keeps the
//! poller out of the way while doing so. The target is validated before
//! anything else happens; a bad URL never reaches the network and never
//! touches poller state.

use crate::notify::{Notification, Notifier};
use crate::processors::event_poller::{EventPoller, TickOutcome};
use hookstorm_sdk::client::ClientError;
use hookstorm_sdk::objects::{InvalidTargetUrl, ReplayOutcome, validate_target_url};
use kanau::processor::Processor;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Replay `event_id` of `endpoint_id` to `target_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayRequest {
    pub endpoint_id: String,
    pub event_id: String,
    pub target_url: String,
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    InvalidTargetUrl(#[from] InvalidTargetUrl),

    /// Another replay holds the busy marker.
    #[error("a replay of event {0} is already in progress")]
    Busy(String),

    /// The backend answered but reported that forwarding failed.
    #[error("replay rejected: {}", .0.error.as_deref().unwrap_or("no reason given"))]
    Rejected(ReplayOutcome),

    #[error("replay request failed: {0}")]
    Client(ClientError),
}

impl From<ClientError> for ReplayError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::InvalidTargetUrl(e) => ReplayError::InvalidTargetUrl(e),
            other => ReplayError::Client(other),
        }
    }
}

/// Serializes replays against the [`EventPoller`].
#[derive(Clone)]
pub struct ReplayCoordinator {
    poller: EventPoller,
    notifier: Arc<dyn Notifier>,
}

impl ReplayCoordinator {
    pub fn new(poller: EventPoller, notifier: Arc<dyn Notifier>) -> Self {
        Self { poller, notifier }
    }

    /// Replay one event.
    ///
    /// While the request is out the event is reported busy and scheduled
    /// ticks are skipped. A successful replay is followed by one immediate
    /// refresh so the new replay count shows up right away.
    pub async fn replay(&self, request: ReplayRequest) -> Result<ReplayOutcome, ReplayError> {
        if let Err(e) = validate_target_url(&request.target_url) {
            warn!(event_id = %request.event_id, error = %e, "Refusing to replay to invalid target");
            self.notifier.notify(Notification::InvalidTargetUrl);
            return Err(e.into());
        }

        let Some(busy) = self.poller.begin_replay(&request.event_id) else {
            debug!(event_id = %request.event_id, "Another replay is in progress");
            return Err(ReplayError::Busy(
                self.poller.replaying_event().unwrap_or_default(),
            ));
        };

        info!(
            endpoint_id = %request.endpoint_id,
            event_id = %request.event_id,
            target_url = %request.target_url.trim(),
            "Replaying event"
        );
        let result = self
            .poller
            .lifecycle()
            .api()
            .replay_event(
                &request.endpoint_id,
                &request.event_id,
                request.target_url.trim(),
            )
            .await;
        drop(busy);

        match result {
            Ok(outcome) if outcome.success => {
                info!(
                    event_id = %request.event_id,
                    response_code = ?outcome.response_code,
                    "Event replayed"
                );
                self.notifier.notify(Notification::EventReplayed);
                let refresh = self.poller.refresh_now().await;
                if refresh == TickOutcome::Failed {
                    warn!("Refresh after replay failed");
                }
                Ok(outcome)
            }
            Ok(outcome) => {
                warn!(
                    event_id = %request.event_id,
                    response_code = ?outcome.response_code,
                    error = ?outcome.error,
                    "Backend reported a failed replay"
                );
                self.notifier.notify(Notification::EventReplayError);
                Err(ReplayError::Rejected(outcome))
            }
            Err(e) => {
                let e = ReplayError::from(e);
                warn!(event_id = %request.event_id, error = %e, "Replay failed");
                self.notifier.notify(match e {
                    ReplayError::InvalidTargetUrl(_) => Notification::InvalidTargetUrl,
                    _ => Notification::EventReplayError,
                });
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Processor trait implementation
// ---------------------------------------------------------------------------

impl Processor<ReplayRequest> for ReplayCoordinator {
    type Output = ReplayOutcome;
    type Error = ReplayError;

    async fn process(&self, request: ReplayRequest) -> Result<ReplayOutcome, ReplayError> {
        self.replay(request).await
    }
}
