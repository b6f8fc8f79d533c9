//! Processors driving the endpoint's event view.
//!
//! - `EventPoller`: Receives `PollTick`, refreshes the event list and renews
//!   the endpoint when it is gone
//! - `ReplayCoordinator`: Receives `ReplayRequest`, replays one event while
//!   holding the poller off

pub mod event_poller;
pub mod replay_coordinator;

pub use event_poller::{DEFAULT_POLL_INTERVAL, EventPoller, PollTick, SkipReason, TickOutcome};
pub use replay_coordinator::{ReplayCoordinator, ReplayError, ReplayRequest};
