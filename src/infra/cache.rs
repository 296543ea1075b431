//! Redis cache implementation.
//!
//! Typed get/set helpers, the current-user profile cache, fixed-window
//! rate limiting and a distributed lock used to serialize spreadsheet
//! batch writes.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use serde::{de::DeserializeOwned, Serialize};
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use crate::config::{
    Config, CACHE_PREFIX_LOCK, CACHE_PREFIX_RATE_LIMIT, CACHE_PREFIX_USER,
    DEFAULT_CACHE_TTL_SECONDS, DEFAULT_LOCK_RETRIES, DEFAULT_LOCK_RETRY_DELAY_MS,
    DEFAULT_LOCK_TTL_SECONDS,
};
use crate::domain::UserResponse;
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Deletes the lock key only while it still holds our token.
const RELEASE_SCRIPT: &str = r#"
    if redis.call("GET", KEYS[1]) == ARGV[1] then
        return redis.call("DEL", KEYS[1])
    else
        return 0
    end
"#;

/// Proof of a held lock, handed back on release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    pub key: String,
    pub lock_id: String,
}

/// Mutual exclusion across every server instance.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Acquire `resource`, retrying with the default budget.
    async fn acquire(&self, resource: &str) -> AppResult<LockToken>;

    /// Release a lock. Releasing an expired or foreign lock is a no-op.
    async fn release(&self, token: LockToken) -> AppResult<()>;
}

/// Redis cache wrapper with connection pooling.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
    default_ttl: u64,
}

impl Cache {
    /// Connect to Redis.
    pub async fn connect(config: &Config) -> Result<Self, RedisError> {
        let client = Client::open(config.redis_url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis cache connected");

        Ok(Self {
            connection,
            default_ttl: DEFAULT_CACHE_TTL_SECONDS,
        })
    }

    /// Round-trip a PING; used by the health check.
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }

    // =========================================================================
    // Generic Cache Operations
    // =========================================================================

    /// Get a value from cache.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await.map_err(cache_error)?;

        match value {
            Some(json) => {
                let parsed = serde_json::from_str(&json).map_err(|e| {
                    AppError::internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Set a value in cache with default TTL.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> AppResult<()> {
        self.set_with_ttl(key, value, self.default_ttl).await
    }

    /// Set a value in cache with custom TTL (in seconds).
    pub async fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let json = serde_json::to_string(value)
            .map_err(|e| AppError::internal(format!("Cache serialization error: {}", e)))?;

        conn.set_ex::<_, _, ()>(key, json, ttl_seconds)
            .await
            .map_err(cache_error)?;

        Ok(())
    }

    /// Delete a value from cache.
    pub async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(key).await.map_err(cache_error)?;
        Ok(())
    }

    // =========================================================================
    // User Cache Operations
    // =========================================================================

    /// Get cached profile by user ID.
    pub async fn get_user(&self, user_id: &Uuid) -> AppResult<Option<UserResponse>> {
        self.get(&user_key(user_id)).await
    }

    /// Cache a profile.
    pub async fn set_user(&self, user: &UserResponse) -> AppResult<()> {
        self.set(&user_key(&user.id), user).await
    }

    /// Invalidate cached profile.
    pub async fn invalidate_user(&self, user_id: &Uuid) -> AppResult<()> {
        self.delete(&user_key(user_id)).await
    }

    // =========================================================================
    // Rate Limiting Operations
    // =========================================================================

    /// Increment the fixed-window counter for `identifier`.
    /// Returns (current_count, is_allowed).
    pub async fn check_rate_limit(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> AppResult<(u64, bool)> {
        let key = format!("{}{}", CACHE_PREFIX_RATE_LIMIT, identifier);
        let mut conn = self.connection.clone();

        let count: i64 = conn.incr(&key, 1).await.map_err(cache_error)?;
        if count == 1 {
            // first hit opens the window
            let _: () = conn
                .expire(&key, window_seconds as i64)
                .await
                .map_err(cache_error)?;
        }

        let count = count.max(0) as u64;
        Ok((count, count <= max_requests))
    }

    // =========================================================================
    // Distributed Lock Operations
    // =========================================================================

    /// Acquire a distributed lock with custom options.
    pub async fn acquire_lock_with_options(
        &self,
        resource: &str,
        ttl_seconds: u64,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> AppResult<LockToken> {
        let key = format!("{}{}", CACHE_PREFIX_LOCK, resource);
        let lock_id = Uuid::new_v4().to_string();
        let mut conn = self.connection.clone();

        for attempt in 0..=max_retries {
            // SET NX EX: only succeeds when nobody holds the key
            let acquired: bool = redis::cmd("SET")
                .arg(&key)
                .arg(&lock_id)
                .arg("NX")
                .arg("EX")
                .arg(ttl_seconds)
                .query_async(&mut conn)
                .await
                .map(|r: Option<String>| r.is_some())
                .map_err(cache_error)?;

            if acquired {
                tracing::debug!(resource = %resource, lock_id = %lock_id, "Lock acquired");
                return Ok(LockToken { key, lock_id });
            }

            if attempt < max_retries {
                sleep(Duration::from_millis(retry_delay_ms)).await;
            }
        }

        tracing::warn!(resource = %resource, "Failed to acquire lock after retries");
        Err(AppError::state_conflict(format!(
            "Resource {} is busy, try again",
            resource
        )))
    }
}

#[async_trait]
impl LockManager for Cache {
    async fn acquire(&self, resource: &str) -> AppResult<LockToken> {
        self.acquire_lock_with_options(
            resource,
            DEFAULT_LOCK_TTL_SECONDS,
            DEFAULT_LOCK_RETRIES,
            DEFAULT_LOCK_RETRY_DELAY_MS,
        )
        .await
    }

    async fn release(&self, token: LockToken) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let released: i32 = redis::cmd("EVAL")
            .arg(RELEASE_SCRIPT)
            .arg(1)
            .arg(&token.key)
            .arg(&token.lock_id)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;

        if released == 1 {
            tracing::debug!(key = %token.key, "Lock released");
        } else {
            tracing::warn!(key = %token.key, "Lock expired before release");
        }
        Ok(())
    }
}

fn user_key(user_id: &Uuid) -> String {
    format!("{}{}", CACHE_PREFIX_USER, user_id)
}

/// Convert Redis error to AppError.
fn cache_error(e: RedisError) -> AppError {
    tracing::error!("Redis error: {}", e);
    AppError::internal(format!("Cache error: {}", e))
}
