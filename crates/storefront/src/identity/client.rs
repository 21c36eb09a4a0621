//! HTTP client for the identity provider's backend API.
//!
//! - `POST {api}/v1/tokens/verify` with `{ "token": ... }` answers
//!   `{ "sub": "<user id>" }` for a live session, 401/404/422 otherwise.
//! - `GET {api}/v1/users/{id}` answers the user record.

use async_trait::async_trait;
use nextcart_core::OwnerId;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use super::{Identity, IdentityError, IdentityProvider, UserProfile};
use crate::config::IdentityConfig;

#[derive(Debug, Deserialize)]
struct VerifiedToken {
    sub: String,
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    primary_email_address_id: Option<String>,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    id: String,
    email_address: String,
}

impl From<UserRecord> for UserProfile {
    fn from(user: UserRecord) -> Self {
        let full_name = [user.first_name, user.last_name]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let primary_email = user
            .email_addresses
            .iter()
            .find(|email| Some(&email.id) == user.primary_email_address_id.as_ref())
            .or_else(|| user.email_addresses.first())
            .map(|email| email.email_address.clone());

        Self {
            full_name: (!full_name.is_empty()).then_some(full_name),
            primary_email,
        }
    }
}

/// Identity provider backend API client.
#[derive(Clone)]
pub struct IdentityClient {
    client: reqwest::Client,
    api_url: String,
}

impl IdentityClient {
    /// Create a new identity provider client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!(
            "Bearer {}",
            config.secret_key.expose_secret()
        ))
        .map_err(|e| IdentityError::Parse(format!("Invalid secret key format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("Authorization", auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for IdentityClient {
    #[instrument(skip_all)]
    async fn verify_session(&self, token: &str) -> Result<Option<Identity>, IdentityError> {
        let response = self
            .client
            .post(format!("{}/v1/tokens/verify", self.api_url))
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let verified: VerifiedToken = response
                    .json()
                    .await
                    .map_err(|e| IdentityError::Parse(e.to_string()))?;
                Ok(Some(Identity {
                    user_id: OwnerId::new(verified.sub),
                }))
            }
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
                Ok(None)
            }
            status => Err(IdentityError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn user_profile(&self, user_id: &OwnerId) -> Result<Option<UserProfile>, IdentityError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/users/{}",
                self.api_url,
                urlencoding::encode(user_id.as_str())
            ))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let user: UserRecord = response
                    .json()
                    .await
                    .map_err(|e| IdentityError::Parse(e.to_string()))?;
                Ok(Some(user.into()))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(IdentityError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }
}
