//! ClauseLens Common Library
//!
//! Shared code for the ClauseLens services including:
//! - Database entities and repository
//! - Generative-AI client abstraction
//! - Error types and handling
//! - Configuration management
//! - Session authentication
//! - Redis cache and upload staging
//! - Metrics and observability

pub mod ai;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod report;

// Re-export commonly used types
pub use ai::ContentGenerator;
pub use cache::Cache;
pub use config::AppConfig;
pub use db::{AnalysisDetail, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default generative model
pub const DEFAULT_AI_MODEL: &str = "gemini-pro";

/// Language recorded on every analysis
pub const DEFAULT_LANGUAGE: &str = "en";
