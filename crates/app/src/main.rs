//! `remosh` -- client-side orchestrator for the mosh backend.
//!
//! Connects to the backend's push WebSocket, keeps an in-memory mirror
//! of job and session state via the reconciliation engine, and exposes
//! that state to frontends through the engine's event bus and action
//! API.
//!
//! # Environment variables
//!
//! | Variable                | Required | Default | Description                              |
//! |-------------------------|----------|---------|------------------------------------------|
//! | `REMOSH_API_URL`        | yes      | --      | Backend HTTP base, e.g. `http://host:8080` |
//! | `REMOSH_WS_URL`         | no       | derived | Push endpoint base, e.g. `ws://host:8080` |
//! | `REMOSH_RECONNECT_SECS` | no       | `1`     | Initial reconnect backoff delay          |

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use remosh_api::BackendClient;
use remosh_engine::{Engine, EventBus};
use remosh_push::{run_push_channel, Backoff, PushClient};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "remosh=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api_url = std::env::var("REMOSH_API_URL").unwrap_or_else(|_| {
        tracing::error!("REMOSH_API_URL environment variable is required");
        std::process::exit(1);
    });

    // Derive the WebSocket base from the API base unless overridden.
    let ws_url = std::env::var("REMOSH_WS_URL").unwrap_or_else(|_| {
        api_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1)
    });

    let initial_delay_secs: u64 = std::env::var("REMOSH_RECONNECT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);

    tracing::info!(
        api_url = %api_url,
        ws_url = %ws_url,
        initial_delay_secs,
        "Starting remosh",
    );

    let cancel = CancellationToken::new();
    let engine = Engine::new(
        BackendClient::new(api_url),
        EventBus::new(),
        cancel.clone(),
    );

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let push_task = tokio::spawn(run_push_channel(
        PushClient::new(ws_url),
        Backoff::new(
            Duration::from_secs(initial_delay_secs),
            Duration::from_secs(30),
        ),
        event_tx,
        cancel.clone(),
    ));

    let engine_task = tokio::spawn(engine.clone().run(event_rx));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
        _ = cancel.cancelled() => {}
    }

    cancel.cancel();
    let _ = push_task.await;
    let _ = engine_task.await;
    tracing::info!("remosh shut down");
}
