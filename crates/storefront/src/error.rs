//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. Route handlers return `Result<T, AppError>`; the
//! body is always `{ "message": "..." }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use nextcart_core::AddressValidationError;
use serde_json::json;
use thiserror::Error;

use crate::content::ContentError;
use crate::identity::IdentityError;
use crate::payments::PaymentError;
use crate::services::addresses::AddressError;
use crate::services::checkout::CheckoutError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Content store operation failed.
    #[error("Content store error: {0}")]
    Content(#[from] ContentError),

    /// Payment provider operation failed.
    #[error("Payment provider error: {0}")]
    Payment(#[from] PaymentError),

    /// Identity provider operation failed.
    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    /// Checkout session could not be created.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Submitted data failed validation.
    #[error(transparent)]
    Validation(#[from] AddressValidationError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing identity or bad shared secret.
    #[error("{0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<AddressError> for AppError {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::Validation(e) => Self::Validation(e),
            AddressError::Content(e) => Self::Content(e),
        }
    }
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Content(_)
                | Self::Payment(_)
                | Self::Identity(_)
                | Self::Checkout(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Content(_)
            | Self::Payment(_)
            | Self::Identity(_)
            | Self::Checkout(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = if self.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
