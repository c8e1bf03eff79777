//! Discord Chatter - chat bridge between a host chat application and Discord
//!
//! Relays the host's outgoing character messages into a Discord channel and
//! posts messages from that channel back into the host as system messages.

mod bridge;
mod common;
mod config;
mod discord;
mod host;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tracing::{error, info, warn};

use bridge::{BridgeController, HostAdapter};
use common::{HostMessage, ReconnectPolicy};
use config::env::{apply_env_overrides, get_settings_path};
use config::validate::{has_required_fields, validate_settings};
use config::{BridgeSettings, DebouncedSave, JsonFileStore, SettingsPanel, EXTENSION_KEY, SAVE_DEBOUNCE};
use discord::SerenityPlatform;
use host::console::{run_console, ConsoleHost};
use host::{EventSource, DEFAULT_CAPACITY, MESSAGE_SENT};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Discord Chatter v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load settings
    let settings_path = get_settings_path();
    info!("Loading settings from {}...", settings_path);

    let store = Arc::new(JsonFileStore::new(&settings_path));
    let settings = BridgeSettings::load_from(store.as_ref(), EXTENSION_KEY).map_err(|e| {
        error!("Failed to load settings: {}", e);
        error!("Please ensure {} is valid JSON or remove it.", settings_path);
        e
    })?;
    let settings = apply_env_overrides(settings);
    info!("Settings loaded: {:?}", settings);

    // ============================================================
    // Wire host, controller and adapter
    // ============================================================
    let host_events = EventSource::<HostMessage>::new(MESSAGE_SENT, DEFAULT_CAPACITY);
    let controller = BridgeController::new(Arc::new(SerenityPlatform::default()));
    let saver = DebouncedSave::spawn(store, EXTENSION_KEY, SAVE_DEBOUNCE);
    let panel = SettingsPanel::new(settings.clone(), saver);

    let (adapter, handle) = HostAdapter::new(
        controller,
        panel,
        Arc::new(ConsoleHost),
        &host_events,
        ReconnectPolicy::default(),
    );

    let mut adapter_task = tokio::spawn(adapter.run());

    if let Err(e) = validate_settings(&settings) {
        warn!("{}", e);
    }

    if has_required_fields(&settings) {
        info!("Settings complete, connecting to Discord...");
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = handle.connect().await {
                warn!("Initial connect failed: {}", e);
            }
        });
    } else {
        info!("Set /token and /channel, then /connect");
    }

    let mut console_task = tokio::spawn(run_console(host_events.clone(), handle.clone()));

    // ============================================================
    // Run until shutdown
    // ============================================================
    let adapter_stopped = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            false
        }
        _ = &mut console_task => {
            info!("Console closed");
            false
        }
        _ = &mut adapter_task => {
            warn!("Bridge adapter stopped unexpectedly");
            true
        }
    };

    console_task.abort();
    if !adapter_stopped {
        handle.shutdown();
        match tokio::time::timeout(Duration::from_secs(5), adapter_task).await {
            Ok(Ok(())) => info!("Bridge shut down gracefully"),
            Ok(Err(e)) => warn!("Bridge adapter task panicked: {}", e),
            Err(_) => warn!("Bridge shutdown timed out"),
        }
    }

    info!("Exiting...");
    // A pending stdin read sits on a blocking thread the runtime would wait for.
    std::process::exit(exit_code(adapter_stopped));
}

/// Process exit status: failure when the adapter died on its own.
fn exit_code(adapter_stopped: bool) -> i32 {
    if adapter_stopped {
        1
    } else {
        0
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
