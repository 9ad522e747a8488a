//! Error type shared by every ClauseLens crate
//!
//! Each [`AppError`] knows its HTTP status and its stable
//! SCREAMING_SNAKE code; [`IntoResponse`] renders both as
//! `{"error": {"code", "message", "field"?}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Machine-readable error code sent to clients
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    MissingField,
    InvalidFormat,
    PayloadTooLarge,
    UnsupportedMediaType,
    UnreadableDocument,
    Unauthorized,
    InvalidSession,
    ExpiredToken,
    NotFound,
    ContractNotFound,
    RateLimited,
    DatabaseError,
    ConnectionError,
    AiError,
    AiTimeout,
    MalformedAiResponse,
    CacheError,
    InternalError,
    ConfigurationError,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    /// `size` is `None` when the body was cut off before its length was known
    #[error("{}", payload_message(.size, .limit))]
    PayloadTooLarge { size: Option<usize>, limit: usize },

    #[error("Unsupported media type: {content_type}")]
    UnsupportedMediaType { content_type: String },

    #[error("Unreadable document: {message}")]
    UnreadableDocument { message: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid session")]
    InvalidSession,

    #[error("Session expired")]
    ExpiredToken,

    #[error("Route not found")]
    RouteNotFound,

    #[error("Contract not found: {id}")]
    ContractNotFound { id: String },

    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("AI service error: {message}")]
    AiError { message: String },

    #[error("AI service timeout after {timeout_secs}s")]
    AiTimeout { timeout_secs: u64 },

    #[error("AI response could not be parsed: {message}")]
    MalformedAiResponse { message: String },

    #[error("Cache error: {message}")]
    CacheError { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

fn payload_message(size: &Option<usize>, limit: &usize) -> String {
    match size {
        Some(size) => format!(
            "Payload too large: {} bytes exceeds limit of {} bytes",
            size, limit
        ),
        None => format!("Payload too large: exceeds limit of {} bytes", limit),
    }
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        use AppError::*;
        match self {
            Validation { .. } => ErrorCode::ValidationError,
            MissingField { .. } => ErrorCode::MissingField,
            InvalidFormat { .. } => ErrorCode::InvalidFormat,
            PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            UnsupportedMediaType { .. } => ErrorCode::UnsupportedMediaType,
            UnreadableDocument { .. } => ErrorCode::UnreadableDocument,
            Unauthorized => ErrorCode::Unauthorized,
            InvalidSession => ErrorCode::InvalidSession,
            ExpiredToken => ErrorCode::ExpiredToken,
            RouteNotFound => ErrorCode::NotFound,
            ContractNotFound { .. } => ErrorCode::ContractNotFound,
            RateLimited { .. } => ErrorCode::RateLimited,
            Database(_) => ErrorCode::DatabaseError,
            DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AiError { .. } => ErrorCode::AiError,
            AiTimeout { .. } => ErrorCode::AiTimeout,
            MalformedAiResponse { .. } => ErrorCode::MalformedAiResponse,
            CacheError { .. } => ErrorCode::CacheError,
            Internal { .. } => ErrorCode::InternalError,
            Configuration { .. } => ErrorCode::ConfigurationError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        use AppError::*;
        match self {
            Validation { .. } | MissingField { .. } | InvalidFormat { .. } => {
                StatusCode::BAD_REQUEST
            }
            Unauthorized | InvalidSession | ExpiredToken => StatusCode::UNAUTHORIZED,
            RouteNotFound | ContractNotFound { .. } => StatusCode::NOT_FOUND,
            PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            UnreadableDocument { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AiError { .. } | MalformedAiResponse { .. } => StatusCode::BAD_GATEWAY,
            AiTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            CacheError { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Database(_) | DatabaseConnection { .. } | Internal { .. } | Configuration { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    fn field(&self) -> Option<String> {
        match self {
            AppError::Validation { field, .. } => field.clone(),
            AppError::MissingField { field } => Some(field.clone()),
            _ => None,
        }
    }
}

/// JSON error envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(error = %message, code = ?code, status = status.as_u16(), "Server error");
        } else {
            tracing::warn!(error = %message, code = ?code, status = status.as_u16(), "Client error");
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                field: self.field(),
            },
        };

        (status, Json(body)).into_response()
    }
}
