#![allow(dead_code)]

mod config;
mod ids;
mod message;
mod metrics;
mod routes;
mod services;
mod state;
mod task;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::message::ChatMessage;
use crate::services::processor::SyntheticProcessor;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    if let Err(e) = run(config).await {
        error!(error = %e, "fatal: server exited");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> std::io::Result<()> {
    let state = AppState::new(config.clone(), Arc::new(SyntheticProcessor));

    let dispatcher_listener = TcpListener::bind(("0.0.0.0", config.http_port)).await?;
    let chat_listener = TcpListener::bind(("0.0.0.0", config.chat_port)).await?;
    info!(port = config.http_port, sla_ms = config.sla_ms, "dispatcher listening");
    info!(port = config.chat_port, "chat bus listening");

    // Shutdown: signal → notice to all sessions → stop accepting → drain.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    {
        let state = state.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                error!("failed to install shutdown signal handler");
                return;
            }
            info!("shutdown signal received");
            let notice = ChatMessage::system(&state.ids, "server shutting down");
            state.sessions.push_to_all(&notice);
            let _ = shutdown_tx.send(true);
        });
    }

    let dispatcher = {
        let app = routes::dispatcher_app(state.clone());
        let rx = shutdown_rx.clone();
        async move {
            axum::serve(dispatcher_listener, app)
                .with_graceful_shutdown(wait_for_shutdown(rx))
                .await
        }
    };
    let chat = {
        let app = routes::chat_app(state.clone());
        let rx = shutdown_rx.clone();
        async move {
            axum::serve(chat_listener, app)
                .with_graceful_shutdown(wait_for_shutdown(rx))
                .await
        }
    };

    tokio::select! {
        result = async { tokio::try_join!(dispatcher, chat) } => {
            result?;
            drain_in_flight(&state).await;
        }
        () = drain_after_shutdown(state.clone(), shutdown_rx) => {
            // In-flight work drained (or grace elapsed) while connections
            // were still open; close out regardless.
        }
    }

    info!("server stopped");
    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        // Signal task is gone without firing; never trigger shutdown.
        std::future::pending::<()>().await;
    }
}

async fn drain_after_shutdown(state: AppState, mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
    drain_in_flight(&state).await;
}

/// Wait for PROCESSING tasks to finish, bounded by the configured grace.
async fn drain_in_flight(state: &AppState) {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(state.config.shutdown_grace_ms);
    loop {
        let in_flight = state.tasks.processing_count();
        if in_flight == 0 {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            warn!(in_flight, "shutdown grace elapsed with tasks still processing");
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
