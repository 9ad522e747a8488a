//! Configuration management for ClauseLens services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Cache configuration (Redis, or in-memory for local runs)
    #[serde(default)]
    pub cache: CacheConfig,

    /// Generative-AI configuration
    #[serde(default)]
    pub ai: AiConfig,

    /// Session authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Upload limits
    #[serde(default)]
    pub upload: UploadConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds; analysis calls are slow, keep this generous
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Postgres URL
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Apply embedded migrations on startup
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Redis URL, or `memory://` for a process-local cache
    #[serde(default = "default_cache_url")]
    pub url: String,

    /// Key prefix for namespacing
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Default TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub default_ttl_secs: u64,

    /// TTL for staged upload bytes
    #[serde(default = "default_upload_ttl")]
    pub upload_ttl_secs: u64,

    /// TTL for cached analyses
    #[serde(default = "default_analysis_ttl")]
    pub analysis_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiConfig {
    /// Provider: gemini, mock
    #[serde(default = "default_ai_provider")]
    pub provider: String,

    /// API key for the generative model
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    #[serde(default = "default_ai_base")]
    pub api_base: String,

    /// Model to use
    #[serde(default = "default_ai_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for transient failures
    #[serde(default = "default_ai_retries")]
    pub max_retries: u32,

    /// Characters of contract text sent for type detection
    #[serde(default = "default_detection_excerpt")]
    pub detection_excerpt_chars: usize,

    /// Contract text is truncated to this many characters before prompting
    #[serde(default = "default_max_contract_chars")]
    pub max_contract_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Secret used to sign session tokens
    pub session_secret: Option<String>,

    /// Session lifetime in seconds
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Name of the session cookie
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Mark cookies Secure (production)
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_upload")]
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log filter (debug, info, warn, error or an EnvFilter directive)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Expose the Prometheus endpoint
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Analysis requests per second
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_true")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 3000 }
fn default_request_timeout() -> u64 { 120 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_cache_url() -> String { "redis://localhost:6379".to_string() }
fn default_key_prefix() -> String { "clauselens".to_string() }
fn default_cache_ttl() -> u64 { 300 }
fn default_upload_ttl() -> u64 { 3600 }
fn default_analysis_ttl() -> u64 { 3600 }
fn default_ai_provider() -> String { "gemini".to_string() }
fn default_ai_base() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_ai_model() -> String { crate::DEFAULT_AI_MODEL.to_string() }
fn default_ai_timeout() -> u64 { 90 }
fn default_ai_retries() -> u32 { 2 }
fn default_detection_excerpt() -> usize { 2000 }
fn default_max_contract_chars() -> usize { 120_000 }
fn default_session_ttl() -> u64 { 24 * 60 * 60 }
fn default_cookie_name() -> String { "clauselens_session".to_string() }
fn default_max_upload() -> usize { 10 * 1024 * 1024 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_rate_limit() -> u32 { 5 }
fn default_burst() -> u32 { 10 }
fn default_true() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/clauselens".to_string(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            run_migrations: default_true(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: default_cache_url(),
            key_prefix: default_key_prefix(),
            default_ttl_secs: default_cache_ttl(),
            upload_ttl_secs: default_upload_ttl(),
            analysis_ttl_secs: default_analysis_ttl(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_ai_provider(),
            api_key: None,
            api_base: default_ai_base(),
            model: default_ai_model(),
            timeout_secs: default_ai_timeout(),
            max_retries: default_ai_retries(),
            detection_excerpt_chars: default_detection_excerpt(),
            max_contract_chars: default_max_contract_chars(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: None,
            session_ttl_secs: default_session_ttl(),
            cookie_name: default_cookie_name(),
            secure_cookies: false,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self { max_bytes: default_max_upload() }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_enabled: default_true(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_true(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__AI__API_KEY=...
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Socket address string to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            ai: AiConfig::default(),
            auth: AuthConfig::default(),
            upload: UploadConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}
