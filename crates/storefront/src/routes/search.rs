//! Product search route.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::state::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Typeahead search over product names and descriptions.
///
/// A blank query answers `{ results: [] }` without touching the content
/// store. Failures answer 500 with empty results so the UI can just show
/// nothing.
#[instrument(skip(state))]
pub async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Response {
    let q = query.q.trim();
    if q.is_empty() {
        return Json(json!({ "results": [] })).into_response();
    }

    match state.content().search_products(q).await {
        Ok(results) => Json(json!({ "results": results })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, query = %q, "Search failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "results": [], "error": "Search failed" })),
            )
                .into_response()
        }
    }
}
