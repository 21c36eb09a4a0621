//! Checkout route: turns the client's cart into a hosted checkout session.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use nextcart_core::{Address, GroupedCartItem, OrderNumber};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireIdentity;
use crate::services::checkout::CheckoutMetadata;
use crate::state::AppState;

/// Stands in for a profile field the identity provider doesn't have.
const UNKNOWN: &str = "Unknown";

/// The grouped cart and the address the buyer picked.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<GroupedCartItem>,
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponse {
    /// Hosted checkout page to send the browser to.
    pub url: String,
}

/// Create a checkout session for the signed-in user.
#[instrument(skip(state, identity, body), fields(user_id = %identity.user_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    body: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let profile = state
        .identity()
        .user_profile(&identity.user_id)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not load user profile");
            None
        })
        .unwrap_or_default();

    let metadata = CheckoutMetadata {
        order_number: OrderNumber::generate(),
        customer_name: profile.full_name.unwrap_or_else(|| UNKNOWN.to_string()),
        customer_email: profile.primary_email.unwrap_or_else(|| UNKNOWN.to_string()),
        owner_id: Some(identity.user_id),
        address: request.address,
    };

    add_breadcrumb(
        "checkout",
        "Creating checkout session",
        Some(&[("order_number", metadata.order_number.as_str())]),
    );

    let url = state
        .checkout()
        .create_session(state.payments(), &request.items, &metadata)
        .await?;

    Ok(Json(CheckoutResponse { url }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use nextcart_core::Product;
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::payments::{Customer, SessionCustomer};
    use crate::routes;
    use crate::test_support::{
        FakeContent, FakeIdentity, FakePayments, address, authed, post_json, send, state_with,
    };

    fn cart() -> serde_json::Value {
        json!({
            "items": [{
                "product": Product::new("p1", "Lamp", Decimal::new(19995, 3)),
                "quantity": 2
            }],
            "address": address("a1", "user_1", true, 1)
        })
    }

    #[tokio::test]
    async fn test_checkout_requires_identity() {
        let payments = Arc::new(FakePayments::default());
        let router = routes::routes().with_state(state_with(
            Arc::new(FakeContent::default()),
            payments.clone(),
            Arc::new(FakeIdentity::signed_in()),
        ));

        let (status, _) = send(router, post_json("/api/checkout", &cart())).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(payments.last_session().is_none());
    }

    #[tokio::test]
    async fn test_checkout_stamps_profile_and_address() {
        let payments = Arc::new(FakePayments::default().with_customer(Customer {
            id: "cus_ada".into(),
            email: Some("ada@example.com".to_string()),
        }));
        let router = routes::routes().with_state(state_with(
            Arc::new(FakeContent::default()),
            payments.clone(),
            Arc::new(FakeIdentity::signed_in()),
        ));

        let (status, body) = send(router, authed(post_json("/api/checkout", &cart()))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], "https://checkout.example.com/session/1");

        let sent = payments.last_session().unwrap();
        assert_eq!(sent.customer, SessionCustomer::Existing("cus_ada".into()));
        assert_eq!(sent.metadata["customerName"], "Ada Lovelace");
        assert_eq!(sent.metadata["customerEmail"], "ada@example.com");
        assert_eq!(sent.metadata["clerkUserId"], "user_1");
        assert!(sent.metadata["address"].contains("\"_id\":\"a1\""));
        assert_eq!(sent.line_items[0].price_data.unit_amount, 2000);
        assert_eq!(sent.line_items[0].quantity, 2);
        assert!(
            sent.success_url
                .ends_with(&format!("orderNumber={}", sent.metadata["orderNumber"]))
        );
    }

    #[tokio::test]
    async fn test_missing_profile_falls_back() {
        let payments = Arc::new(FakePayments::default());
        let identity = FakeIdentity::default().with_user("tok_user_1", "user_1", None);
        let router = routes::routes().with_state(state_with(
            Arc::new(FakeContent::default()),
            payments.clone(),
            Arc::new(identity),
        ));

        let (status, _) = send(
            router,
            authed(post_json("/api/checkout", &json!({ "items": [] }))),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let sent = payments.last_session().unwrap();
        assert_eq!(sent.metadata["customerName"], "Unknown");
        assert_eq!(sent.metadata["address"], "null");
        assert_eq!(
            sent.customer,
            SessionCustomer::Guest {
                email: "Unknown".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_provider_failure_is_500() {
        let router = routes::routes().with_state(state_with(
            Arc::new(FakeContent::default()),
            Arc::new(FakePayments::default().failing_sessions()),
            Arc::new(FakeIdentity::signed_in()),
        ));

        let (status, body) = send(router, authed(post_json("/api/checkout", &cart()))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }
}
