mod bootstrap;
mod chat;
mod health;

use std::time::Duration;

use anyhow::Result;
use axum::Router;

use optibot_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use optibot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let router = Router::new()
        .merge(health::router(app.catalog.clone()))
        .merge(chat::router(app.runtime.clone()));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        business = %app.config.business.name,
        "optibot-server started"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let (drain_tx, drain_rx) = tokio::sync::oneshot::channel();
    let shutdown = async move {
        wait_for_shutdown().await;
        let _ = drain_tx.send(());
    };
    let server = tokio::spawn(async move {
        axum::serve(listener, router).with_graceful_shutdown(shutdown).await
    });

    // In-flight turns get `grace` seconds after the signal, then the process
    // stops regardless.
    let _ = drain_rx.await;
    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined??,
        Err(_elapsed) => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                grace_secs = grace.as_secs(),
                "graceful drain window elapsed; stopping with turns in flight"
            );
        }
    }

    tracing::info!(event_name = "system.server.stopped", "optibot-server stopped");

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            error = %error,
            "shutdown signal listener failed; stopping immediately"
        );
        return;
    }
    tracing::info!(event_name = "system.server.stopping", "shutdown signal received");
}
