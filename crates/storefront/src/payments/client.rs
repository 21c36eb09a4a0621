//! HTTP client for the payment provider's REST API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use super::{CheckoutSession, CheckoutSessionParams, Customer, PaymentError, PaymentProvider};
use crate::config::PaymentsConfig;

/// Payment provider API base URL.
const BASE_URL: &str = "https://api.stripe.com/v1";

/// List envelope returned by search endpoints.
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

/// Error envelope returned on failures.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Payment provider API client.
#[derive(Clone)]
pub struct PaymentsClient {
    client: reqwest::Client,
    base_url: String,
}

impl PaymentsClient {
    /// Create a new payment provider client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &PaymentsConfig) -> Result<Self, PaymentError> {
        Self::with_base_url(config, BASE_URL)
    }

    /// Create a client against a different API host.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn with_base_url(config: &PaymentsConfig, base_url: &str) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| PaymentError::Config(format!("Invalid secret key format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert("Authorization", auth_header);

        // Pin the API version so response shapes don't move under us
        headers.insert(
            "Stripe-Version",
            HeaderValue::from_str(&config.api_version)
                .map_err(|e| PaymentError::Config(format!("Invalid API version: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| PaymentError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Turn a non-success response into a `PaymentError::Api`.
    async fn api_error(response: reqwest::Response) -> PaymentError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ErrorResponse>(&body).map_or_else(
            |_| body.chars().take(200).collect(),
            |envelope| {
                let kind = envelope.error.kind.unwrap_or_default();
                let message = envelope.error.message.unwrap_or_default();
                format!("{kind}: {message}")
            },
        );

        PaymentError::Api { status, message }
    }
}

#[async_trait]
impl PaymentProvider for PaymentsClient {
    #[instrument(skip(self))]
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, PaymentError> {
        let url = format!("{}/customers", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("email", email), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let list: ListResponse<Customer> = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;

        Ok(list.data.into_iter().next())
    }

    #[instrument(skip(self, params), fields(line_items = params.line_items.len()))]
    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/checkout/sessions", self.base_url);

        let response = self
            .client
            .post(&url)
            .form(&params.to_form())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))
    }
}
