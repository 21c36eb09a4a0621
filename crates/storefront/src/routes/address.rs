//! Address book routes. Both require a signed-in user.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use nextcart_core::{Address, AddressSubmission};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireIdentity;
use crate::services::addresses::AddressListing;
use crate::state::AppState;

/// The user's addresses, newest first, and the selected one.
#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn index(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
) -> Result<Json<AddressListing>> {
    let listing = state.addresses().list(&identity.user_id).await?;
    Ok(Json(listing))
}

/// Save a new address. Replies 201 with the stored record.
#[instrument(skip(state, identity, body), fields(user_id = %identity.user_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    body: std::result::Result<Json<AddressSubmission>, JsonRejection>,
) -> Result<(StatusCode, Json<Address>)> {
    let Json(submission) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let address = state
        .addresses()
        .create(&identity.user_id, submission)
        .await?;

    Ok((StatusCode::CREATED, Json(address)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use super::*;
    use crate::routes;
    use crate::test_support::{
        FakeContent, FakeIdentity, FakePayments, UnsetBehavior, address, authed, get, post_json,
        send, state_with,
    };

    fn app(content: Arc<FakeContent>) -> axum::Router {
        routes::routes().with_state(state_with(
            content,
            Arc::new(FakePayments::default()),
            Arc::new(FakeIdentity::signed_in()),
        ))
    }

    fn body(make_default: bool) -> Value {
        json!({
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "address": "12 Analytical Way",
            "city": "London",
            "state": "LDN",
            "zip": "N1 9GU",
            "makeDefault": make_default
        })
    }

    #[tokio::test]
    async fn test_requires_identity() {
        let content = Arc::new(FakeContent::default());
        let router = app(content.clone());

        let (status, reply) = send(router.clone(), post_json("/api/address", &body(true))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply["message"], "Unauthorized");

        let (status, _) = send(router, get("/api/address")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        assert_eq!(content.unset_calls(), 0);
        assert!(content.addresses_of("user_1").is_empty());
    }

    #[tokio::test]
    async fn test_unknown_token_is_rejected() {
        let mut request = get("/api/address");
        request
            .headers_mut()
            .insert("authorization", "Bearer tok_forged".parse().unwrap());

        let (status, _) = send(app(Arc::new(FakeContent::default())), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_field_is_rejected() {
        let content = Arc::new(FakeContent::default());
        let mut incomplete = body(false);
        incomplete.as_object_mut().unwrap().remove("zip");

        let (status, reply) = send(
            app(content.clone()),
            authed(post_json("/api/address", &incomplete)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply["message"], "Missing required fields");
        assert!(content.addresses_of("user_1").is_empty());
    }

    #[tokio::test]
    async fn test_create_returns_record() {
        let content = Arc::new(FakeContent::default());

        let (status, reply) = send(
            app(content.clone()),
            authed(post_json("/api/address", &body(false))),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(reply["clerkUserId"], "user_1");
        assert_eq!(reply["address"], "12 Analytical Way");
        assert_eq!(reply["default"], false);
        assert!(reply["_id"].is_string());
        assert!(reply["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_make_default_with_failing_unset() {
        let content = Arc::new(
            FakeContent::default()
                .with_addresses(vec![address("old", "user_1", true, 1)])
                .with_unset(UnsetBehavior::FailAfterWrite),
        );
        let router = app(content.clone());

        let (status, created) =
            send(router.clone(), authed(post_json("/api/address", &body(true)))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, listing) = send(router, authed(get("/api/address"))).await;
        assert_eq!(status, StatusCode::OK);

        let defaults: Vec<&Value> = listing["addresses"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|a| a["default"] == true)
            .collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0]["_id"], created["_id"]);
        assert_eq!(listing["selected"]["_id"], created["_id"]);
    }

    #[tokio::test]
    async fn test_backend_failure() {
        let content = Arc::new(FakeContent::default().failing_creates());

        let (status, reply) =
            send(app(content), authed(post_json("/api/address", &body(false)))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reply["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let request = authed(
            axum::http::Request::builder()
                .method("POST")
                .uri("/api/address")
                .header("content-type", "application/json")
                .body(axum::body::Body::from("{not json"))
                .unwrap(),
        );

        let (status, _) = send(app(Arc::new(FakeContent::default())), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
