//! HTTP and WebSocket handlers

pub mod history;
pub mod socket;

use axum::{extract::State, routing::get, Router};

use crate::config::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // Real-time channel
        .route("/", get(socket::ws_handler))
        .route("/ws", get(socket::ws_handler))
        // Paginated durable history
        .route("/history", get(history::get_history))
        .route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> String {
    format!("OK - Chat Relay ({} connections)", state.registry.len())
}
