//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//!
//! Identity is resolved per handler through the extractors in [`auth`].

pub mod auth;
pub mod request_id;

pub use auth::RequireIdentity;
pub use request_id::request_id_middleware;
