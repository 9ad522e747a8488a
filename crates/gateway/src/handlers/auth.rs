//! Session endpoints
//!
//! Login happens through the OAuth provider; these handlers only describe
//! and end an existing session.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::CurrentUser;
use crate::AppState;
use clauselens_common::{
    auth::token_fingerprint,
    cache::keys,
    db::models::User,
    errors::Result,
};

/// Public view of a user
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub profile_picture: Option<String>,
    pub is_premium: bool,
    pub created_at: DateTime<FixedOffset>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            profile_picture: user.profile_picture,
            is_premium: user.is_premium,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

pub async fn current_user(current: CurrentUser) -> Json<UserProfile> {
    Json(current.user.into())
}

/// Revoke the presented token until it would have expired anyway
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse> {
    let key = keys::revoked_session(&token_fingerprint(&current.token));
    let ttl = current.claims.remaining_secs().max(1);
    state.cache.set_with_ttl(&key, &true, ttl).await?;

    tracing::info!(user_id = %current.user.id, "Session revoked");

    let mut cookie = format!(
        "{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax",
        state.sessions.cookie_name()
    );
    if state.config.auth.secure_cookies {
        cookie.push_str("; Secure");
    }

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LogoutResponse {
            message: "Logged out".to_string(),
        }),
    ))
}
