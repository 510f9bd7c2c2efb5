mod bootstrap;
mod chat;
mod health;

use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use shopchat_core::config::{AppConfig, LoadOptions};
use tokio::sync::oneshot;

use crate::bootstrap::Application;
use crate::chat::ChatState;

fn init_logging(config: &AppConfig) {
    use shopchat_core::config::LogFormat::*;
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
    // Logging depends on config, so config errors surface through anyhow only.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        model_loaded = app.runtime.is_model_loaded(),
        "shopchat-server listening"
    );

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, routes(&app)).with_graceful_shutdown(async move {
        let _ = stop_rx.await;
    });
    let mut handle = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut handle => {
            joined.context("server task panicked")?.context("server terminated unexpectedly")?;
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => signal.context("failed to listen for ctrl-c")?,
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "shopchat-server stopping"
    );
    let _ = stop_tx.send(());

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, handle).await {
        Ok(joined) => joined.context("server task panicked")??,
        Err(_) => tracing::warn!(
            event_name = "system.server.shutdown_forced",
            correlation_id = "shutdown",
            grace_secs = grace.as_secs(),
            "in-flight requests did not finish before the shutdown deadline"
        ),
    }

    Ok(())
}

fn routes(app: &Application) -> Router {
    let chat_state = ChatState::new(
        app.runtime.clone(),
        app.config.shop.whatsapp_number.clone(),
        Duration::from_secs(app.config.server.request_timeout_secs),
    );
    chat::router(chat_state).merge(health::router(app.runtime.clone()))
}
