//! NextCart storefront library.
//!
//! This crate provides the storefront HTTP API and the client-side flows as a
//! library, allowing them to be tested and reused.
//!
//! # Architecture
//!
//! - Axum JSON API in front of three hosted services: a GROQ content store
//!   (catalog and addresses), a payment provider (hosted checkout) and an
//!   identity provider (sign-in).
//! - Each service sits behind a trait ([`content::ContentStore`],
//!   [`payments::PaymentProvider`], [`identity::IdentityProvider`]) so tests
//!   can swap in fakes.
//! - The cart itself lives in the client ([`nextcart_core::CartStore`]); the
//!   [`client`] module holds the typeahead and cart page flows.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod client;
pub mod config;
pub mod content;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod payments;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;

use axum::{Router, extract::Request};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router with tracing and request ids.
///
/// Sentry layers are added by the binary, outermost.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .with_state(state)
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
}
