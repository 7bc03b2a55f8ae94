use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::info;

use storefront_api::config::{init_tracing, load_config};
use storefront_api::events::{process_events, EventSender};
use storefront_api::{db, AppState};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("Failed to load configuration")?;
    init_tracing(&config.log_level, config.log_json);
    info!(environment = %config.environment, "Starting storefront-api");

    let pool = db::establish_connection_from_app_config(&config)
        .await
        .context("Failed to connect to the database")?;
    if config.auto_migrate {
        db::run_migrations(&pool)
            .await
            .context("Failed to run migrations")?;
    }

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let events = Arc::new(EventSender::new(tx));
    tokio::spawn(process_events(rx));

    let state = AppState::new(Arc::new(pool), Arc::new(config.clone()), events);
    let app = storefront_api::app_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Shutdown signal received");
}
