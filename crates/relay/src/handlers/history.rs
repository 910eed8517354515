//! Paginated history endpoint

use axum::{
    extract::{Query, State},
    Json,
};
use tracing::info;

use crate::config::AppState;
use crate::error::Result;
use crate::models::{HistoryPage, HistoryQuery};
use crate::pagination::{fetch_page, PageRequest};

/// GET /history?page=&limit=
///
/// Page 1 holds the newest messages; each page is oldest first.
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>> {
    let request = PageRequest::from_query(
        &query,
        state.config.default_page_size,
        state.config.max_page_size,
    );
    info!("GET /history page={} limit={}", request.page, request.limit);

    let messages = fetch_page(&state.history, request).await;

    Ok(Json(HistoryPage {
        page: request.page,
        limit: request.limit,
        messages,
    }))
}
