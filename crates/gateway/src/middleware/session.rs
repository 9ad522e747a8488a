//! Session authentication extractor
//!
//! Resolves the session token from the `Authorization` header or the
//! session cookie, rejects revoked tokens and loads the user row.

use crate::AppState;
use axum::{extract::FromRequestParts, http::request::Parts};
use clauselens_common::{
    auth::{extract_token, token_fingerprint, SessionClaims},
    cache::keys,
    db::models::User,
    errors::AppError,
};
use tracing::debug;

/// Authenticated user for the current request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
    pub claims: SessionClaims,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Already resolved by the rate limiter
        if let Some(current) = parts.extensions.get::<CurrentUser>() {
            return Ok(current.clone());
        }

        let token = extract_token(&parts.headers, state.sessions.cookie_name())
            .ok_or(AppError::Unauthorized)?;

        let claims = state.sessions.validate(&token)?;

        // Cache errors propagate as 503
        let revoked_key = keys::revoked_session(&token_fingerprint(&token));
        if state.cache.exists(&revoked_key).await? {
            debug!("Rejected revoked session token");
            return Err(AppError::InvalidSession);
        }

        let user_id = claims.user_id()?;
        let user = state
            .repository
            .find_user_by_id(user_id)
            .await?
            .ok_or(AppError::InvalidSession)?;

        Ok(Self { user, token, claims })
    }
}
