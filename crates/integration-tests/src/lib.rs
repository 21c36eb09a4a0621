//! Integration tests for the NextCart storefront.
//!
//! These run against a live storefront wired to real (or staging) content,
//! payment and identity services, so every test is `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the storefront
//! cargo run -p nextcart-storefront
//!
//! # Run integration tests
//! STOREFRONT_BASE_URL=http://localhost:3000 cargo test -p nextcart-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `storefront_catalog` - Product listing, search and product reads
//! - `storefront_guards` - Sign-in and webhook secret checks

use reqwest::Client;

/// Base URL for the storefront (configurable via environment).
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Build a URL under the storefront base.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", storefront_base_url().trim_end_matches('/'))
}

/// Plain HTTP client with no session.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .build()
        .expect("Failed to create HTTP client")
}
