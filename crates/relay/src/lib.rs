//! Chat Relay Library
//!
//! WebSocket fan-out with an in-memory hydration buffer and a Redis-backed
//! durable history served over paginated HTTP reads.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod registry;
pub mod service;
pub mod store;
pub mod validator;

use std::sync::Arc;

use axum::Router;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{AppState, RelayConfig, StoreBackend};
use service::MessageService;
use store::{HistoryStore, ListStore, MemoryListStore, RedisListStore};

/// Build the list store selected by `config`.
pub fn list_store(config: &RelayConfig) -> anyhow::Result<Arc<dyn ListStore>> {
    let list: Arc<dyn ListStore> = match config.store_backend {
        StoreBackend::Redis => Arc::new(RedisListStore::new(&config.redis_url)?),
        StoreBackend::Memory => Arc::new(MemoryListStore::new()),
    };
    Ok(list)
}

/// Hydrate the message service from `list` and assemble shared state.
pub async fn build_state(
    config: RelayConfig,
    list: Arc<dyn ListStore>,
) -> (AppState, JoinHandle<()>) {
    let history = Arc::new(HistoryStore::new(
        list,
        config.history_key.clone(),
        config.max_history,
    ));
    let (service, worker) = MessageService::start(history.clone(), config.limits()).await;
    (AppState::new(config, service, history), worker)
}

/// The full HTTP/WebSocket router
pub fn app(state: AppState) -> Router {
    handlers::router()
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

pub async fn run() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_err()
    {
        // Already set, ignore
    }

    let config = RelayConfig::default();
    info!("=== Chat Relay ===");
    info!("History store: {:?} ({})", config.store_backend, config.history_key);

    let list = list_store(&config)?;
    let addr = config.bind_addr;
    let (state, _worker) = build_state(config, list).await;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Chat relay listening on ws://{}", addr);
    axum::serve(listener, app(state)).await?;

    Ok(())
}
