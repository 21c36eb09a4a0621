//! Payment provider access.
//!
//! The provider hosts the checkout page. We look customers up by email and
//! create checkout sessions; everything after the redirect (payment,
//! fulfilment webhooks) happens on the provider's side.

mod client;
pub mod types;

pub use client::PaymentsClient;
pub use types::{
    CheckoutMode, CheckoutSession, CheckoutSessionParams, Customer, PaymentMethodType,
    PriceData, ProductData, SessionCustomer, SessionLineItem,
};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the request.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Failed to build the HTTP client.
    #[error("Client configuration error: {0}")]
    Config(String),
}

/// Operations the checkout needs from the payment provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Most recent customer with exactly this email, if any.
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, PaymentError>;

    /// Create a hosted checkout session.
    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<CheckoutSession, PaymentError>;
}
