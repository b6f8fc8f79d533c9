//! Application state shared by every subcommand.

use crate::config::WatchConfig;
use hookstorm_core::lifecycle::{EndpointLifecycle, LifecycleError};
use hookstorm_core::notify::{Notification, Notifier, TracingNotifier};
use hookstorm_core::processors::{EventPoller, ReplayCoordinator};
use hookstorm_core::storage::FileStore;
use hookstorm_sdk::client::HookstormClient;
use hookstorm_sdk::objects::Endpoint;
use std::sync::Arc;
use tokio::sync::watch;

/// Everything wired together once at startup.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: EndpointLifecycle,
    pub poller: EventPoller,
    pub coordinator: ReplayCoordinator,
    notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Build the client stack described by `config`.
    ///
    /// `shutdown_rx` is the teardown signal for the poller.
    pub fn new(config: &WatchConfig, shutdown_rx: watch::Receiver<bool>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let api = HookstormClient::new(config.api_base_url.clone()).with_http_client(http);
        let store = FileStore::new(&config.storage_dir);
        let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

        let lifecycle = EndpointLifecycle::new(
            Arc::new(api),
            Arc::new(store),
            notifier.clone(),
            config.lifecycle_settings(),
        );
        let poller = EventPoller::new(lifecycle.clone(), config.poll_interval, shutdown_rx);
        let coordinator = ReplayCoordinator::new(poller.clone(), notifier.clone());

        Ok(Self {
            lifecycle,
            poller,
            coordinator,
            notifier,
        })
    }

    /// Load, verify or create the endpoint to work with.
    ///
    /// Creation failures are already reported by the lifecycle; anything
    /// else is surfaced as a fetch error.
    pub async fn acquire_endpoint(&self, notify: bool) -> Result<Endpoint, LifecycleError> {
        let result = self.lifecycle.get_valid_endpoint(notify).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "Error fetching endpoint");
            if notify && !matches!(e, LifecycleError::Create(_)) {
                self.notifier.notify(Notification::FetchError);
            }
        }
        result
    }
}
