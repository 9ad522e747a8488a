//! API handlers module

pub mod auth;
pub mod contracts;
pub mod health;
pub mod payments;

use clauselens_common::errors::AppError;

/// Fallback for unknown routes
pub async fn not_found() -> AppError {
    AppError::RouteNotFound
}
