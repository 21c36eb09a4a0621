//! Identity provider access.
//!
//! Sign-in happens entirely on the identity provider. Browsers send us the
//! provider's session token (bearer header or `__session` cookie); we ask the
//! provider who it belongs to and, when needed, fetch the user's profile.

mod client;

pub use client::IdentityClient;

use async_trait::async_trait;
use nextcart_core::OwnerId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when talking to the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an unexpected status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// The signed-in user behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: OwnerId,
}

/// Profile details the checkout stamps on an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// "First Last", if the user set either.
    pub full_name: Option<String>,
    /// The user's primary email address.
    pub primary_email: Option<String>,
}

/// Operations the storefront needs from the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a session token. `None` if the token is invalid or expired.
    async fn verify_session(&self, token: &str) -> Result<Option<Identity>, IdentityError>;

    /// Profile of a user. `None` if the user no longer exists.
    async fn user_profile(&self, user_id: &OwnerId) -> Result<Option<UserProfile>, IdentityError>;
}
