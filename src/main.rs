//! Statuscaster - status-mention broadcast campaign runner
//!
//! Connects to a messaging backend through a protocol sidecar and runs
//! mention campaigns: posts status broadcasts and notifies the mentioned
//! recipients in paced batches.

mod campaign;
mod common;
mod config;
mod control;
mod events;
mod gateway;
mod lifecycle;
mod resolver;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use common::{RunOutcome, SinkEvent};
use config::{env::get_config_path, load_and_validate};
use control::Controller;
use events::EventSink;
use gateway::auth::FileCredentialStore;
use gateway::sidecar::SidecarConnector;
use lifecycle::{LifecycleManager, DEFAULT_RECONNECT_DELAY};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Statuscaster v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        error!("See campaign.example.json for reference.");
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Sidecar: {}", config.gateway.base_url);
    info!("  Messages: {}", config.messages.len());
    if config.settings.use_group {
        info!(
            "  Recipients: group {}",
            config.settings.group_jid.as_deref().unwrap_or("-")
        );
    } else {
        info!("  Recipients: {} manual entries", config.recipients.len());
    }

    let sink = Arc::new(EventSink::new());

    // Render progress updates; log lines are already mirrored to tracing
    {
        let (_, mut events_rx) = sink.subscribe();
        tokio::spawn(async move {
            loop {
                match events_rx.recv().await {
                    Ok(SinkEvent::Progress(update)) if !update.hide => {
                        info!("[{:>3}%] {}", update.percent, update.text);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    let store = Arc::new(FileCredentialStore::new(&config.gateway.auth_dir));
    if store.has_session() {
        info!("Found stored session in {}", config.gateway.auth_dir);
    } else {
        info!("No stored session, QR authentication will be required");
    }

    let connector = Arc::new(SidecarConnector::new(config.gateway.base_url.clone()));

    // ============================================================
    // Start the lifecycle event loop
    // ============================================================
    let (manager, lifecycle) = LifecycleManager::new(
        connector,
        store,
        Arc::clone(&sink),
        DEFAULT_RECONNECT_DELAY,
    );
    tokio::spawn(manager.run());

    // Surface QR payloads so the operator can render them
    {
        let mut status_rx = lifecycle.subscribe_status();
        tokio::spawn(async move {
            let mut last_qr: Option<String> = None;
            while status_rx.changed().await.is_ok() {
                let qr = status_rx.borrow_and_update().qr.clone();
                if let Some(payload) = &qr {
                    if qr != last_qr {
                        info!("Scan this QR payload to authenticate: {}", payload);
                    }
                }
                last_qr = qr;
            }
        });
    }

    let controller = Controller::new(lifecycle.clone(), Arc::clone(&sink), Arc::new(config));

    // ============================================================
    // Connect, then run the campaign
    // ============================================================
    controller.start_connection().await?;

    info!("Waiting for the connection to become ready...");
    tokio::select! {
        result = lifecycle.wait_ready() => result?,
        _ = shutdown_signal() => {
            info!("Shutdown requested before the connection was established");
            if let Err(e) = controller.disconnect().await {
                warn!("Disconnect failed: {}", e);
            }
            return Ok(());
        }
    }

    debug!("Status: {:?}", controller.status());

    let mut run = controller.start_campaign().await?;

    let outcome = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - stopping campaign...");
            if controller.stop_campaign().is_ok() {
                // The in-flight batch is allowed to finish
                match tokio::time::timeout(Duration::from_secs(30), &mut run).await {
                    Ok(Ok(outcome)) => Some(outcome),
                    Ok(Err(e)) => {
                        warn!("Campaign task panicked: {}", e);
                        None
                    }
                    Err(_) => {
                        warn!("Campaign did not stop in time, aborting");
                        run.abort();
                        None
                    }
                }
            } else {
                None
            }
        }
        result = &mut run => match result {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!("Campaign task panicked: {}", e);
                None
            }
        },
    };

    match &outcome {
        Some(RunOutcome::Completed) => info!("Campaign completed"),
        Some(RunOutcome::Interrupted) => info!("Campaign interrupted"),
        Some(RunOutcome::Failed(message)) => error!("Campaign failed: {}", message),
        None => {}
    }

    if let Err(e) = controller.disconnect().await {
        warn!("Disconnect failed: {}", e);
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
