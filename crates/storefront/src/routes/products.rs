//! Product catalog routes.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use nextcart_core::Product;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::content::ProductFilter;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Product listing query parameters. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub variant: Option<String>,
    /// Brand slug.
    pub brand: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
}

/// Empty strings count as "not given".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// A price bound, falling back to `default` when absent, empty, non-numeric
/// or not finite.
fn bound(value: Option<&str>, default: f64) -> f64 {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

impl From<ProductListQuery> for ProductFilter {
    fn from(query: ProductListQuery) -> Self {
        Self {
            min: bound(query.min.as_deref(), Self::DEFAULT_MIN),
            max: bound(query.max.as_deref(), Self::DEFAULT_MAX),
            variant: non_empty(query.variant),
            brand: non_empty(query.brand),
            category: non_empty(query.category),
        }
    }
}

/// List products matching the filters, ordered by name.
///
/// Replies `{ ok: true, data }`, or 500 `{ ok: false, error }`.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Response {
    let filter = ProductFilter::from(query);

    match state.content().products(&filter).await {
        Ok(data) => Json(json!({ "ok": true, "data": data })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Product listing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": "Failed to fetch products" })),
            )
                .into_response()
        }
    }
}

/// Cache key a product is stored under.
#[must_use]
pub fn product_path(slug: &str) -> String {
    format!("/product/{slug}")
}

/// Single product by slug, served from the revalidation cache.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Product>> {
    let path = product_path(&slug);
    let tags = ["product".to_string(), format!("product:{slug}")];

    state
        .product_cache()
        .get_or_load(&path, &tags, || state.content().product_by_slug(&slug))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))
}
