use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use tracing::{info, warn};

use gridrush::config::{default_rooms, ServerConfig};
use gridrush::dict::Dictionary;
use gridrush::events::EventBus;
use gridrush::http_api::{self, ApiState};
use gridrush::room::RoomManager;
use gridrush::worker::SearchPool;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting gridrush server");

    let config = ServerConfig::from_env();

    info!("Loading dictionary from {:?}", config.wordlist);
    let dict = Arc::new(Dictionary::load_or_empty(&config.wordlist));

    info!("Starting grid search worker");
    let pool = SearchPool::spawn(dict.clone());

    let events = EventBus::new(256);
    spawn_event_logger(&events);

    info!("Starting rooms");
    let manager = Arc::new(RoomManager::start(
        default_rooms(),
        dict,
        pool,
        events.clone(),
    ));

    let router = http_api::create_router(ApiState { manager });
    let http_addr = format!("{}:{}", config.host, config.http_port);
    info!("Starting HTTP API server on {}", http_addr);

    axum::serve(tokio::net::TcpListener::bind(&http_addr).await?, router)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}

/// Logs every outbound event, so a bare server is still observable.
fn spawn_event_logger(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!(target: "gridrush::events", "{json}"),
                    Err(e) => warn!("unserializable event: {e}"),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event logger lagged behind");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
