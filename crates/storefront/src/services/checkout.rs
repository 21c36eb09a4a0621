//! Checkout session builder.
//!
//! Turns the grouped cart plus buyer metadata into a hosted checkout session
//! on the payment provider and hands back the redirect URL.
//!
//! Errors are logged here and passed back unchanged. There is no retry and no
//! partial success; the caller decides what the buyer sees.

use std::collections::BTreeMap;

use nextcart_core::{
    Address, CurrencyCode, GroupedCartItem, OrderNumber, OwnerId, ProductId, to_minor_units,
};
use thiserror::Error;
use tracing::instrument;

use crate::content::ImageUrlBuilder;
use crate::payments::{
    CheckoutMode, CheckoutSessionParams, PaymentError, PaymentMethodType, PaymentProvider,
    PriceData, ProductData, SessionCustomer, SessionLineItem,
};

/// Shown on the hosted page for products without a name.
const UNNAMED_PRODUCT: &str = "Unknown Product";

/// The provider substitutes this with the real session id on redirect.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Errors from building or submitting a checkout session.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// A price too large to express in minor units.
    #[error("Price of product {0} cannot be expressed in minor units")]
    Amount(ProductId),

    #[error("Failed to serialize checkout metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    /// The provider created the session but gave no URL to send the buyer to.
    #[error("Checkout session {0} has no redirect URL")]
    MissingRedirect(String),
}

/// Buyer details stamped on one checkout attempt.
#[derive(Debug, Clone)]
pub struct CheckoutMetadata {
    pub order_number: OrderNumber,
    pub customer_name: String,
    pub customer_email: String,
    pub owner_id: Option<OwnerId>,
    pub address: Option<Address>,
}

impl CheckoutMetadata {
    /// Flatten into the provider's string-only metadata map.
    ///
    /// An absent owner becomes `""`. An absent address is serialized like any
    /// other value and so becomes the text `null`; reconciliation tooling
    /// downstream reads that string.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Metadata`] if the address fails to serialize.
    pub fn to_session_metadata(&self) -> Result<BTreeMap<String, String>, CheckoutError> {
        Ok(BTreeMap::from([
            ("orderNumber".to_string(), self.order_number.to_string()),
            ("customerName".to_string(), self.customer_name.clone()),
            ("customerEmail".to_string(), self.customer_email.clone()),
            (
                "clerkUserId".to_string(),
                self.owner_id
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            ),
            ("address".to_string(), serde_json::to_string(&self.address)?),
        ]))
    }
}

/// Builds and submits checkout sessions.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    base_url: String,
    currency: CurrencyCode,
    images: ImageUrlBuilder,
}

impl CheckoutService {
    /// `base_url` is where the provider sends the buyer back to, without a
    /// trailing slash.
    #[must_use]
    pub fn new(base_url: impl Into<String>, currency: CurrencyCode, images: ImageUrlBuilder) -> Self {
        Self {
            base_url: base_url.into(),
            currency,
            images,
        }
    }

    /// One line item per grouped cart entry.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Amount`] if a price overflows minor units.
    pub fn line_items(
        &self,
        items: &[GroupedCartItem],
    ) -> Result<Vec<SessionLineItem>, CheckoutError> {
        items
            .iter()
            .map(|item| {
                let product = &item.product;
                let unit_amount = to_minor_units(product.price)
                    .ok_or_else(|| CheckoutError::Amount(product.id.clone()))?;

                let images = product
                    .primary_image()
                    .and_then(|image| self.images.url_for(image))
                    .map(|url| vec![url]);

                Ok(SessionLineItem {
                    price_data: PriceData {
                        currency: self.currency,
                        unit_amount,
                        product_data: ProductData {
                            name: product
                                .name
                                .clone()
                                .unwrap_or_else(|| UNNAMED_PRODUCT.to_string()),
                            description: product.description.clone(),
                            images,
                            metadata: BTreeMap::from([(
                                "id".to_string(),
                                product.id.to_string(),
                            )]),
                        },
                    },
                    quantity: item.quantity,
                })
            })
            .collect()
    }

    /// Assemble the full session request.
    ///
    /// # Errors
    ///
    /// Fails if a line item or the metadata cannot be built.
    pub fn session_params(
        &self,
        items: &[GroupedCartItem],
        metadata: &CheckoutMetadata,
        customer: SessionCustomer,
    ) -> Result<CheckoutSessionParams, CheckoutError> {
        Ok(CheckoutSessionParams {
            mode: CheckoutMode::Payment,
            allow_promotion_codes: true,
            payment_method_types: vec![PaymentMethodType::Card],
            invoice_creation: true,
            success_url: format!(
                "{}/success?session_id={SESSION_ID_PLACEHOLDER}&orderNumber={}",
                self.base_url,
                urlencoding::encode(metadata.order_number.as_str())
            ),
            cancel_url: format!("{}/cart", self.base_url),
            customer,
            metadata: metadata.to_session_metadata()?,
            line_items: self.line_items(items)?,
        })
    }

    /// Create a hosted checkout session and return its redirect URL.
    ///
    /// The buyer is attached to an existing provider customer with the same
    /// email when one is found; otherwise the session carries the email for
    /// guest checkout. An empty cart still produces a session.
    ///
    /// # Errors
    ///
    /// Any lookup, build or submission failure, logged and returned as is.
    #[instrument(
        skip(self, payments, items, metadata),
        fields(order_number = %metadata.order_number, items = items.len())
    )]
    pub async fn create_session(
        &self,
        payments: &dyn PaymentProvider,
        items: &[GroupedCartItem],
        metadata: &CheckoutMetadata,
    ) -> Result<String, CheckoutError> {
        // Recently created customers may not show up in search yet, in which
        // case a second customer record gets created for the same email.
        let customer = payments
            .find_customer_by_email(&metadata.customer_email)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Customer lookup failed"))?
            .map_or_else(
                || SessionCustomer::Guest {
                    email: metadata.customer_email.clone(),
                },
                |customer| SessionCustomer::Existing(customer.id),
            );

        let params = self
            .session_params(items, metadata, customer)
            .inspect_err(|e| tracing::error!(error = %e, "Failed to build checkout session"))?;

        let session = payments
            .create_checkout_session(&params)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Checkout session creation failed"))?;

        tracing::info!(session_id = %session.id, "Checkout session created");

        session.url.ok_or_else(|| {
            tracing::error!(session_id = %session.id, "Checkout session has no URL");
            CheckoutError::MissingRedirect(session.id)
        })
    }
}
