//! HTTP client for the storefront's own JSON API.

use async_trait::async_trait;
use nextcart_core::{Address, AddressSubmission, GroupedCartItem, Product};
use reqwest::Response;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use super::cart_page::CartPageApi;
use super::typeahead::SearchSource;
use crate::routes::checkout::{CheckoutRequest, CheckoutResponse};
use crate::services::addresses::AddressListing;

/// Errors from calling the storefront API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status.
    #[error("{status}: {message}")]
    Status { status: u16, message: String },

    /// Bad base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Product>,
}

/// Error envelopes the API uses: `{ message }`, or `{ error }` on the
/// catalog endpoints.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Client for the storefront API, optionally signed in.
#[derive(Clone)]
pub struct StorefrontApiClient {
    client: reqwest::Client,
    base_url: Url,
    session_token: Option<SecretString>,
}

impl std::fmt::Debug for StorefrontApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl StorefrontApiClient {
    /// Client for the storefront at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Url`] if `base_url` does not parse.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join drops the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            session_token: None,
        })
    }

    /// Send the identity provider's session token with every request.
    #[must_use]
    pub fn with_session_token(mut self, token: SecretString) -> Self {
        self.session_token = Some(token);
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.session_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        Err(ClientError::Status {
            status: status.as_u16(),
            message: body
                .message
                .or(body.error)
                .unwrap_or_else(|| status.to_string()),
        })
    }

    /// `GET /api/search-products`.
    ///
    /// # Errors
    ///
    /// Transport failures and non-success statuses.
    #[instrument(skip(self))]
    pub async fn search_products(&self, query: &str) -> Result<Vec<Product>, ClientError> {
        let response = self
            .client
            .get(self.endpoint("api/search-products")?)
            .query(&[("q", query)])
            .send()
            .await?;

        let body: SearchResponse = Self::check(response).await?.json().await?;
        Ok(body.results)
    }

    /// `GET /api/address`.
    ///
    /// # Errors
    ///
    /// Transport failures and non-success statuses (401 when signed out).
    #[instrument(skip(self))]
    pub async fn addresses(&self) -> Result<AddressListing, ClientError> {
        let request = self.client.get(self.endpoint("api/address")?);
        let response = self.authorize(request).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// `POST /api/address`.
    ///
    /// # Errors
    ///
    /// Transport failures and non-success statuses.
    #[instrument(skip_all)]
    pub async fn create_address(
        &self,
        submission: &AddressSubmission,
    ) -> Result<Address, ClientError> {
        let request = self
            .client
            .post(self.endpoint("api/address")?)
            .json(submission);
        let response = self.authorize(request).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// `POST /api/checkout`; returns the hosted checkout URL.
    ///
    /// # Errors
    ///
    /// Transport failures and non-success statuses.
    #[instrument(skip_all, fields(items = items.len()))]
    pub async fn checkout(
        &self,
        items: Vec<GroupedCartItem>,
        address: Option<Address>,
    ) -> Result<String, ClientError> {
        let request = self
            .client
            .post(self.endpoint("api/checkout")?)
            .json(&CheckoutRequest { items, address });
        let response = self.authorize(request).send().await?;
        let body: CheckoutResponse = Self::check(response).await?.json().await?;
        Ok(body.url)
    }
}

#[async_trait]
impl SearchSource for StorefrontApiClient {
    async fn search(&self, query: &str) -> Result<Vec<Product>, ClientError> {
        self.search_products(query).await
    }
}

#[async_trait]
impl CartPageApi for StorefrontApiClient {
    async fn addresses(&self) -> Result<AddressListing, ClientError> {
        Self::addresses(self).await
    }

    async fn create_address(&self, submission: &AddressSubmission) -> Result<Address, ClientError> {
        Self::create_address(self, submission).await
    }

    async fn checkout(
        &self,
        items: Vec<GroupedCartItem>,
        address: Option<Address>,
    ) -> Result<String, ClientError> {
        Self::checkout(self, items, address).await
    }
}
