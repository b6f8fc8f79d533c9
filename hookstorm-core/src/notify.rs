//! User-facing notifications.
//!
//! The lifecycle and replay code report outcomes as [`Notification`]
//! values; how they are shown is up to the [`Notifier`] the application
//! plugs in.

use tracing::{error, info};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Every message the client can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notification {
    EndpointCreated,
    EndpointRenewed,
    /// Renewal of an existing endpoint failed.
    EndpointError,
    /// The first endpoint of the session could not be created.
    EndpointCreateError,
    EventReplayed,
    EventReplayError,
    InvalidTargetUrl,
    FetchError,
    /// The saved endpoint could not be read and was discarded.
    StorageCorrupt,
}

impl Notification {
    pub fn title(&self) -> &'static str {
        match self {
            Notification::EndpointCreated => "Endpoint created",
            Notification::EndpointRenewed => "Endpoint renewed",
            Notification::EventReplayed => "Event replayed",
            Notification::InvalidTargetUrl => "Invalid target URL",
            Notification::StorageCorrupt => "Saved endpoint discarded",
            Notification::EndpointError
            | Notification::EndpointCreateError
            | Notification::EventReplayError
            | Notification::FetchError => "Error",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Notification::EndpointCreated => {
                "Your new webhook endpoint has been created successfully."
            }
            Notification::EndpointRenewed => {
                "Your webhook endpoint has been automatically renewed."
            }
            Notification::EndpointError => {
                "Failed to renew webhook endpoint. Please refresh the page."
            }
            Notification::EndpointCreateError => {
                "Failed to create webhook endpoint. Please try again."
            }
            Notification::EventReplayed => "The webhook event has been replayed successfully.",
            Notification::EventReplayError => "Failed to replay webhook event. Please try again.",
            Notification::InvalidTargetUrl => "Enter an absolute http or https URL to replay to.",
            Notification::FetchError => {
                "Failed to fetch webhook data. Please try refreshing the page."
            }
            Notification::StorageCorrupt => {
                "The saved webhook endpoint could not be read. A new one will be created."
            }
        }
    }

    pub fn level(&self) -> NotificationLevel {
        match self {
            Notification::EndpointCreated
            | Notification::EndpointRenewed
            | Notification::EventReplayed => NotificationLevel::Success,
            Notification::EndpointError
            | Notification::EndpointCreateError
            | Notification::EventReplayError
            | Notification::InvalidTargetUrl
            | Notification::FetchError
            | Notification::StorageCorrupt => NotificationLevel::Error,
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title(), self.description())
    }
}

/// Sink for [`Notification`]s.
///
/// Called synchronously from async code, so implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level() {
            NotificationLevel::Error => error!(
                title = notification.title(),
                "{}",
                notification.description()
            ),
            NotificationLevel::Success => info!(
                title = notification.title(),
                "{}",
                notification.description()
            ),
        }
    }
}

/// Drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: Notification) {}
}
