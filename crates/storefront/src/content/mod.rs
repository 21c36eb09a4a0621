//! Content store access.
//!
//! # Architecture
//!
//! - Products, brands, categories and addresses live in a hosted document
//!   store queried with GROQ. It is the source of truth; nothing is synced
//!   locally.
//! - [`ContentStore`] is the seam route handlers and services depend on.
//!   [`ContentClient`] is the HTTP implementation.
//! - Rendered product reads are cached in [`RevalidationCache`] until the
//!   content store announces a change through the revalidation webhook.

mod cache;
mod client;
mod image;
pub mod queries;

pub use cache::RevalidationCache;
pub use client::ContentClient;
pub use image::ImageUrlBuilder;

use async_trait::async_trait;
use nextcart_core::{Address, NewAddress, OwnerId, Product};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur when talking to the content store.
#[derive(Debug, Error)]
pub enum ContentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The content API answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body was not what we expected.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A write was attempted without a write token configured.
    #[error("No write token configured for the content store")]
    MissingWriteToken,
}

/// Catalog filters accepted by the product listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductFilter {
    /// Product variant, compared case-insensitively.
    pub variant: Option<String>,
    /// Brand slug.
    pub brand: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    /// Inclusive lower price bound.
    pub min: f64,
    /// Inclusive upper price bound.
    pub max: f64,
}

impl ProductFilter {
    pub const DEFAULT_MIN: f64 = 0.0;
    pub const DEFAULT_MAX: f64 = 10_000.0;
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            variant: None,
            brand: None,
            category: None,
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}

/// Operations the storefront needs from the content store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Products matching the filter, ordered by name ascending, with
    /// categories projected to their titles.
    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, ContentError>;

    /// Typeahead search over product names and descriptions.
    async fn search_products(&self, term: &str) -> Result<Vec<Product>, ContentError>;

    /// A single product by slug.
    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, ContentError>;

    /// All addresses owned by a user, newest first.
    async fn addresses_for(&self, owner: &OwnerId) -> Result<Vec<Address>, ContentError>;

    /// Clear the default flag on every address the user owns.
    async fn unset_default_addresses(&self, owner: &OwnerId) -> Result<(), ContentError>;

    /// Persist a new address and return the stored record.
    async fn create_address(&self, address: NewAddress) -> Result<Address, ContentError>;
}
