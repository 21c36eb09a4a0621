//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check
//!
//! # Catalog
//! GET  /api/products           - Filtered product listing ({ ok, data })
//! GET  /api/search-products    - Typeahead search ({ results })
//! GET  /product/{slug}         - Single product (cached until revalidated)
//!
//! # Address book (requires identity)
//! GET  /api/address            - Addresses and current selection
//! POST /api/address            - Create an address
//!
//! # Checkout (requires identity)
//! POST /api/checkout           - Create a hosted checkout session ({ url })
//!
//! # Webhooks
//! POST /api/revalidate?secret= - Content changed; drop cached reads
//! ```

pub mod address;
pub mod checkout;
pub mod products;
pub mod revalidate;
pub mod search;

use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/search-products", get(search::search))
        .route("/address", get(address::index).post(address::create))
        .route("/checkout", post(checkout::create))
        .route("/revalidate", post(revalidate::revalidate))
}

/// Create the health check router.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/ready", get(|| async { StatusCode::OK }))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/product/{slug}", get(products::show))
        .nest("/api", api_routes())
        .nest("/health", health_routes())
}
