//! Per-user rate limiting for model-backed routes (token bucket)

use crate::middleware::CurrentUser;
use crate::AppState;
use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::Response,
};
use clauselens_common::errors::AppError;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use uuid::Uuid;

/// One bucket per authenticated user
pub type UserRateLimiter = DefaultKeyedRateLimiter<Uuid>;

/// Create a new rate limiter; zero values are raised to one
pub fn create_rate_limiter(requests_per_second: u32, burst: u32) -> Arc<UserRateLimiter> {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(rate);
    let quota = Quota::per_second(rate).allow_burst(burst);

    Arc::new(RateLimiter::keyed(quota))
}

/// Authenticate, then charge the caller's bucket.
///
/// The resolved [`CurrentUser`] is stashed in the request extensions so the
/// handler does not look the session up a second time.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();
    let current = CurrentUser::from_request_parts(&mut parts, &state).await?;

    if state.config.rate_limit.enabled && state.limiter.check_key(&current.user.id).is_err() {
        tracing::warn!(
            user_id = %current.user.id,
            path = %parts.uri.path(),
            "Rate limit exceeded"
        );
        return Err(AppError::RateLimited {
            limit: state.config.rate_limit.requests_per_second,
        });
    }

    parts.extensions.insert(current);
    Ok(next.run(Request::from_parts(parts, body)).await)
}
