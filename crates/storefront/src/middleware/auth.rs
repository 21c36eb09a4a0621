//! Identity extractors.
//!
//! The browser carries the identity provider's session token either as an
//! `Authorization: Bearer` header or in the `__session` cookie. The extractor
//! resolves it through the provider held in [`AppState`].

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::identity::Identity;
use crate::state::AppState;

/// Cookie the identity provider's frontend SDK stores its session token in.
pub const SESSION_COOKIE: &str = "__session";

/// Extractor that requires a signed-in user.
///
/// Rejects with 401 `{ "message": "Unauthorized" }` before the handler runs.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireIdentity(identity): RequireIdentity) -> impl IntoResponse {
///     format!("Hello, {}!", identity.user_id)
/// }
/// ```
pub struct RequireIdentity(pub Identity);

impl FromRequestParts<AppState> for RequireIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

        let identity = state
            .identity()
            .verify_session(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

        set_sentry_user(&identity.user_id);
        Ok(Self(identity))
    }
}

/// Session token from the bearer header, else from the session cookie.
fn session_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
            .map(|(_, value)| value)
    })
}
