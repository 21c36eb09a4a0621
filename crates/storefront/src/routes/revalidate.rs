//! Content revalidation webhook.
//!
//! The content store calls this after a document is published. Product
//! changes drop the product's cached page and everything tagged `product`.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::AppError;
use crate::routes::products::product_path;
use crate::state::AppState;

/// Tag carried by every cached product read.
pub const PRODUCT_TAG: &str = "product";

#[derive(Debug, Deserialize)]
pub struct RevalidateQuery {
    pub secret: Option<String>,
}

#[instrument(skip_all)]
pub async fn revalidate(
    State(state): State<AppState>,
    Query(query): Query<RevalidateQuery>,
    body: Bytes,
) -> Response {
    let authorized = query
        .secret
        .as_deref()
        .filter(|secret| !secret.is_empty())
        .is_some_and(|secret| secret == state.webhook_secret().expose_secret());
    if !authorized {
        tracing::warn!("Revalidation webhook with bad secret");
        return AppError::Unauthorized("Invalid secret".to_string()).into_response();
    }

    // Any JSON is accepted; fields of the wrong shape just count as absent
    let document: Value = match serde_json::from_slice(&body) {
        Ok(document) => document,
        Err(e) => {
            tracing::error!(error = %e, "Unreadable revalidation payload");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Error revalidating" })),
            )
                .into_response();
        }
    };

    if document.get("_type").and_then(Value::as_str) == Some("product") {
        let cache = state.product_cache();
        if let Some(slug) = document
            .pointer("/slug/current")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        {
            cache.invalidate_path(&product_path(slug)).await;
        }
        cache.invalidate_tag(PRODUCT_TAG);
    }

    Json(json!({ "revalidated": true, "now": Utc::now().timestamp_millis() })).into_response()
}
