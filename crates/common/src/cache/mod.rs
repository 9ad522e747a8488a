//! Cache integration
//!
//! Provides:
//! - Redis backend over a multiplexed connection
//! - In-memory backend for local runs and tests
//! - Generic get/set operations with TTL
//! - Self-healing reads that evict undecodable entries
//! - Upload staging (raw bytes)

use crate::config::CacheConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Key/value store with per-entry expiry
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<()>;

    /// Returns whether a key was removed
    async fn delete(&self, key: &str) -> Result<bool>;

    async fn ping(&self) -> Result<()>;

    /// Backend name for logs and readiness output
    fn name(&self) -> &'static str;
}

/// Redis-backed store
pub struct RedisBackend {
    connection: MultiplexedConnection,
}

impl RedisBackend {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url).map_err(|e| AppError::CacheError {
            message: format!("Failed to create Redis client: {}", e),
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to connect to Redis: {}", e),
            })?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(|e| AppError::CacheError {
            message: format!("Failed to get key '{}': {}", key, e),
        })?;
        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs.max(1))
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to set key '{}': {}", key, e),
            })
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection.clone();
        let deleted: i64 = conn.del(key).await.map_err(|e| AppError::CacheError {
            message: format!("Failed to delete key '{}': {}", key, e),
        })?;
        Ok(deleted > 0)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Redis ping failed: {}", e),
            })?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Process-local store; expired entries are dropped lazily on read
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, (Vec<u8>, Instant)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live keys, sorted
    pub async fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, (_, expires))| *expires > now)
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((value, expires)) if *expires > now => return Ok(Some(value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<()> {
        let expires = Instant::now() + Duration::from_secs(ttl_secs.max(1));
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value, expires));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Namespaced cache client
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    key_prefix: String,
    default_ttl_secs: u64,
}

impl Cache {
    /// Connect using configuration; `memory://` selects the in-process backend
    pub async fn connect(config: &CacheConfig) -> Result<Self> {
        let backend: Arc<dyn CacheBackend> = if config.url.starts_with("memory") {
            info!("Using in-memory cache backend");
            Arc::new(MemoryBackend::new())
        } else {
            info!("Connecting to Redis...");
            Arc::new(RedisBackend::connect(&config.url).await?)
        };

        Ok(Self::with_backend(
            backend,
            config.key_prefix.clone(),
            config.default_ttl_secs,
        ))
    }

    pub fn with_backend(
        backend: Arc<dyn CacheBackend>,
        key_prefix: impl Into<String>,
        default_ttl_secs: u64,
    ) -> Self {
        Self {
            backend,
            key_prefix: key_prefix.into(),
            default_ttl_secs,
        }
    }

    /// In-memory cache with default prefix
    pub fn in_memory() -> Self {
        Self::with_backend(Arc::new(MemoryBackend::new()), "clauselens", 300)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    /// Get a JSON value; an undecodable entry is an error
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let full_key = self.key(key);
        match self.backend.get_raw(&full_key).await? {
            Some(bytes) => {
                let parsed = serde_json::from_slice(&bytes).map_err(|e| AppError::CacheError {
                    message: format!("Failed to parse cached value: {}", e),
                })?;
                debug!(key = %full_key, "Cache hit");
                Ok(Some(parsed))
            }
            None => {
                debug!(key = %full_key, "Cache miss");
                Ok(None)
            }
        }
    }

    /// Get a JSON value, deleting the entry if it cannot be decoded
    pub async fn get_or_evict<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let full_key = self.key(key);
        let Some(bytes) = self.backend.get_raw(&full_key).await? else {
            debug!(key = %full_key, "Cache miss");
            return Ok(None);
        };

        match serde_json::from_slice(&bytes) {
            Ok(parsed) => {
                debug!(key = %full_key, "Cache hit");
                Ok(Some(parsed))
            }
            Err(e) => {
                warn!(key = %full_key, error = %e, "Evicting corrupt cache entry");
                self.backend.delete(&full_key).await?;
                Ok(None)
            }
        }
    }

    /// Set a value with default TTL
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set_with_ttl(key, value, self.default_ttl_secs).await
    }

    pub async fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> Result<()> {
        let full_key = self.key(key);
        let json = serde_json::to_vec(value).map_err(|e| AppError::CacheError {
            message: format!("Failed to serialize value: {}", e),
        })?;

        self.backend.set_raw(&full_key, json, ttl_secs).await?;
        debug!(key = %full_key, ttl_secs, "Cache set");
        Ok(())
    }

    /// Store raw bytes (staged uploads)
    pub async fn set_bytes(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<()> {
        let full_key = self.key(key);
        let size = value.len();
        self.backend.set_raw(&full_key, value, ttl_secs).await?;
        debug!(key = %full_key, size, ttl_secs, "Cache set bytes");
        Ok(())
    }

    pub async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.backend.get_raw(&self.key(key)).await
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        let full_key = self.key(key);
        let deleted = self.backend.delete(&full_key).await?;
        debug!(key = %full_key, deleted, "Cache delete");
        Ok(deleted)
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.backend.get_raw(&self.key(key)).await?.is_some())
    }

    pub async fn ping(&self) -> Result<()> {
        self.backend.ping().await
    }
}

/// Cache key builder helpers
pub mod keys {
    use uuid::Uuid;

    /// Staged upload bytes for a user; unique even within one millisecond
    pub fn upload(user_id: Uuid, millis: i64) -> String {
        format!("upload:{}:{}:{}", user_id, millis, Uuid::new_v4())
    }

    /// Cached analysis detail
    pub fn contract(contract_id: Uuid) -> String {
        format!("contract:{}", contract_id)
    }

    /// Revoked session marker
    pub fn revoked_session(fingerprint: &str) -> String {
        format!("session:revoked:{}", fingerprint)
    }
}
