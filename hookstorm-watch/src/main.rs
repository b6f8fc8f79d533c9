//! hookstorm-watch
//!
//! Keeps a disposable webhook endpoint alive, prints the events it receives
//! and replays them to other targets.

mod config;
mod display;
mod shutdown;
mod state;

use clap::{Parser, Subcommand};
use config::{ConfigLoader, Overrides};
use display::{EventPrinter, format_endpoint, format_event_line};
use hookstorm_core::lifecycle::CreateOptions;
use hookstorm_core::processors::{ReplayRequest, TickOutcome};
use kanau::processor::Processor;
use shutdown::spawn_shutdown_listener;
use state::AppState;
use std::path::PathBuf;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// hookstorm-watch - disposable webhook endpoints from the terminal
#[derive(Parser, Debug)]
#[command(name = "hookstorm-watch")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (default: ./hookstorm.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, env = "HOOKSTORM_API_URL")]
    api_url: Option<Url>,

    /// Override the directory the current endpoint is stored in
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Override the poll interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print incoming events until interrupted (default)
    Watch,
    /// Print the current endpoint and its events once
    Show,
    /// Replace the current endpoint with a new one
    New,
    /// Replay one event of the current endpoint to a target URL
    Replay { event_id: String, target_url: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::debug!("Starting hookstorm-watch v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = ConfigLoader::new(
        args.config,
        Overrides {
            api_url: args.api_url,
            storage_dir: args.storage_dir,
            interval_ms: args.interval_ms,
        },
    );
    let config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!(
        api = %config.api_base_url,
        storage = %config.storage_dir.display(),
        "Configuration loaded"
    );

    let shutdown_rx = spawn_shutdown_listener();
    let state = AppState::new(&config, shutdown_rx.clone())?;

    match args.command.unwrap_or(Command::Watch) {
        Command::Watch => watch_events(state, shutdown_rx).await,
        Command::Show => show(state).await,
        Command::New => new_endpoint(state).await,
        Command::Replay {
            event_id,
            target_url,
        } => replay(state, event_id, target_url).await,
    }
}

async fn watch_events(
    state: AppState,
    mut shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let endpoint = state.acquire_endpoint(true).await?;
    println!(
        "Listening on {}",
        format_endpoint(&endpoint, OffsetDateTime::now_utc())
    );

    let mut endpoint_rx = state.lifecycle.subscribe();
    endpoint_rx.mark_unchanged();
    let mut events_rx = state.poller.subscribe_events();
    let mut current_id = endpoint.id;
    let mut printer = EventPrinter::default();

    state.poller.refresh_now().await;
    let poller = tokio::spawn(state.poller.clone().run());

    loop {
        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }

            Ok(()) = endpoint_rx.changed() => {
                let renewed = endpoint_rx
                    .borrow_and_update()
                    .clone()
                    .filter(|endpoint| endpoint.id != current_id);
                if let Some(endpoint) = renewed {
                    println!(
                        "Endpoint renewed, now listening on {}",
                        format_endpoint(&endpoint, OffsetDateTime::now_utc())
                    );
                    current_id = endpoint.id;
                    printer.reset();
                }
            }

            Ok(()) = events_rx.changed() => {
                let events = events_rx.borrow_and_update().clone();
                for event in printer.fresh(&events) {
                    println!("{}", format_event_line(event));
                }
            }
        }
    }

    poller.await?;
    Ok(())
}

async fn show(state: AppState) -> anyhow::Result<()> {
    let endpoint = state.acquire_endpoint(true).await?;
    println!("{}", format_endpoint(&endpoint, OffsetDateTime::now_utc()));

    let refreshed = state.poller.refresh_now().await;
    if let TickOutcome::Failed | TickOutcome::Cancelled = refreshed {
        anyhow::bail!("could not fetch events ({refreshed:?})");
    }

    let events = state.poller.events();
    if events.is_empty() {
        println!("No events received yet");
    }
    for event in events.iter() {
        println!("{}", format_event_line(event));
        println!("{}", serde_json::to_string_pretty(&event.body)?);
    }
    Ok(())
}

async fn new_endpoint(state: AppState) -> anyhow::Result<()> {
    let endpoint = state
        .lifecycle
        .create_new_endpoint(CreateOptions::initial())
        .await?;
    println!("{}", format_endpoint(&endpoint, OffsetDateTime::now_utc()));
    Ok(())
}

async fn replay(state: AppState, event_id: String, target_url: String) -> anyhow::Result<()> {
    let endpoint = state.acquire_endpoint(false).await?;
    let outcome = state
        .coordinator
        .process(ReplayRequest {
            endpoint_id: endpoint.id,
            event_id,
            target_url,
        })
        .await?;

    match outcome.response_code {
        Some(code) => println!("Replayed, target answered {code}"),
        None => println!("Replayed"),
    }
    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
