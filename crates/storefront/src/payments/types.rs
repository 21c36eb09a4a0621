//! Payment provider request and response types.
//!
//! Requests are form-encoded with bracketed keys
//! (`line_items[0][price_data][unit_amount]=1999`); [`CheckoutSessionParams::to_form`]
//! produces those pairs.

use std::collections::BTreeMap;

use nextcart_core::{CurrencyCode, CustomerId};
use serde::Deserialize;

/// A customer record held by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    #[serde(default)]
    pub email: Option<String>,
}

/// A created checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted page to redirect the buyer to.
    #[serde(default)]
    pub url: Option<String>,
}

/// Session mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    /// One-off payment.
    Payment,
}

impl CheckoutMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "payment",
        }
    }
}

/// Accepted payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethodType {
    Card,
}

impl PaymentMethodType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
        }
    }
}

/// Who the session is for. A session names either an existing customer or a
/// raw email, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCustomer {
    Existing(CustomerId),
    Guest { email: String },
}

/// Product shown on a line of the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductData {
    pub name: String,
    pub description: Option<String>,
    /// `None` omits the field; an empty list is never sent.
    pub images: Option<Vec<String>>,
    pub metadata: BTreeMap<String, String>,
}

/// Ad-hoc price for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceData {
    pub currency: CurrencyCode,
    /// Amount in minor units.
    pub unit_amount: i64,
    pub product_data: ProductData,
}

/// One checkout line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
    pub price_data: PriceData,
    pub quantity: u32,
}

/// Everything needed to create a checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionParams {
    pub mode: CheckoutMode,
    pub allow_promotion_codes: bool,
    pub payment_method_types: Vec<PaymentMethodType>,
    pub invoice_creation: bool,
    pub success_url: String,
    pub cancel_url: String,
    pub customer: SessionCustomer,
    /// Flat string metadata; the provider accepts nothing nested.
    pub metadata: BTreeMap<String, String>,
    pub line_items: Vec<SessionLineItem>,
}

impl CheckoutSessionParams {
    /// Encode as form pairs in the provider's bracket notation.
    #[must_use]
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), self.mode.as_str().to_string()),
            (
                "allow_promotion_codes".to_string(),
                self.allow_promotion_codes.to_string(),
            ),
            (
                "invoice_creation[enabled]".to_string(),
                self.invoice_creation.to_string(),
            ),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];

        for (i, method) in self.payment_method_types.iter().enumerate() {
            form.push((
                format!("payment_method_types[{i}]"),
                method.as_str().to_string(),
            ));
        }

        match &self.customer {
            SessionCustomer::Existing(id) => form.push(("customer".to_string(), id.to_string())),
            SessionCustomer::Guest { email } => {
                form.push(("customer_email".to_string(), email.clone()));
            }
        }

        for (key, value) in &self.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }

        for (i, item) in self.line_items.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            let price = &item.price_data;
            let product = &price.product_data;

            form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
            form.push((
                format!("{prefix}[price_data][currency]"),
                price.currency.as_str().to_string(),
            ));
            form.push((
                format!("{prefix}[price_data][unit_amount]"),
                price.unit_amount.to_string(),
            ));
            form.push((
                format!("{prefix}[price_data][product_data][name]"),
                product.name.clone(),
            ));
            if let Some(description) = &product.description {
                form.push((
                    format!("{prefix}[price_data][product_data][description]"),
                    description.clone(),
                ));
            }
            if let Some(images) = &product.images {
                for (j, image) in images.iter().enumerate() {
                    form.push((
                        format!("{prefix}[price_data][product_data][images][{j}]"),
                        image.clone(),
                    ));
                }
            }
            for (key, value) in &product.metadata {
                form.push((
                    format!("{prefix}[price_data][product_data][metadata][{key}]"),
                    value.clone(),
                ));
            }
        }

        form
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(customer: SessionCustomer) -> CheckoutSessionParams {
        CheckoutSessionParams {
            mode: CheckoutMode::Payment,
            allow_promotion_codes: true,
            payment_method_types: vec![PaymentMethodType::Card],
            invoice_creation: true,
            success_url: "http://localhost:3000/success".to_string(),
            cancel_url: "http://localhost:3000/cart".to_string(),
            customer,
            metadata: BTreeMap::from([("orderNumber".to_string(), "o-1".to_string())]),
            line_items: vec![SessionLineItem {
                price_data: PriceData {
                    currency: CurrencyCode::USD,
                    unit_amount: 2000,
                    product_data: ProductData {
                        name: "Lamp".to_string(),
                        description: None,
                        images: None,
                        metadata: BTreeMap::from([("id".to_string(), "p1".to_string())]),
                    },
                },
                quantity: 2,
            }],
        }
    }

    fn value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_form_encodes_session_settings() {
        let form = params(SessionCustomer::Existing(CustomerId::new("cus_1"))).to_form();

        assert_eq!(value(&form, "mode"), Some("payment"));
        assert_eq!(value(&form, "allow_promotion_codes"), Some("true"));
        assert_eq!(value(&form, "invoice_creation[enabled]"), Some("true"));
        assert_eq!(value(&form, "payment_method_types[0]"), Some("card"));
        assert_eq!(value(&form, "metadata[orderNumber]"), Some("o-1"));
        assert_eq!(value(&form, "customer"), Some("cus_1"));
        assert_eq!(value(&form, "customer_email"), None);
    }

    #[test]
    fn test_form_encodes_line_items() {
        let form = params(SessionCustomer::Guest {
            email: "c@d.com".to_string(),
        })
        .to_form();

        assert_eq!(value(&form, "line_items[0][quantity]"), Some("2"));
        assert_eq!(value(&form, "line_items[0][price_data][currency]"), Some("usd"));
        assert_eq!(value(&form, "line_items[0][price_data][unit_amount]"), Some("2000"));
        assert_eq!(
            value(&form, "line_items[0][price_data][product_data][metadata][id]"),
            Some("p1")
        );
        assert!(
            form.iter()
                .all(|(k, _)| !k.contains("[images]") && !k.ends_with("[description]"))
        );
        assert_eq!(value(&form, "customer_email"), Some("c@d.com"));
        assert_eq!(value(&form, "customer"), None);
    }
}
