//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, CacheService};
use async_trait::async_trait;
use redis::{
    AsyncCommands, Client, ExistenceCheck, Script, SetExpiry, SetOptions, aio::ConnectionManager,
};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Deletes `KEYS[1]` only when it still holds `ARGV[1]`.
const RELEASE_LOCK_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

/// Redis cache implementation.
///
/// Uses connection pooling via `ConnectionManager` for efficient connection reuse.
/// All operations are fail-open: errors are logged but don't propagate to callers.
pub struct RedisCache {
    client: ConnectionManager,
    key_prefix: String,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis");

        Ok(Self {
            client: manager,
            key_prefix: "blog:".to_string(),
        })
    }

    /// Constructs the full Redis key with namespace prefix.
    fn build_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let full_key = self.build_key(key);
        let mut conn = self.client.clone();

        match conn.get::<_, Option<String>>(&full_key).await {
            Ok(value) => {
                debug!(hit = value.is_some(), "Cache GET {}", key);
                Ok(value)
            }
            Err(e) => {
                error!("Redis GET error for {}: {}", key, e);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let full_key = self.build_key(key);
        let mut conn = self.client.clone();

        let result = match ttl {
            Some(ttl) => {
                conn.set_ex::<_, _, ()>(&full_key, value, ttl.as_secs().max(1))
                    .await
            }
            None => conn.set::<_, _, ()>(&full_key, value).await,
        };

        if let Err(e) = result {
            warn!("Redis SET error for {}: {}", key, e);
        }
        Ok(())
    }

    async fn get_or_insert(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<String> {
        let full_key = self.build_key(key);
        let mut conn = self.client.clone();

        let options = SetOptions::default()
            .conditional_set(ExistenceCheck::NX)
            .with_expiration(SetExpiry::PX(ttl.as_millis() as u64))
            .get(true);

        // SET NX GET returns the previous value when the key existed, nil when we stored ours.
        match conn
            .set_options::<_, _, Option<String>>(&full_key, value, options)
            .await
        {
            Ok(Some(existing)) => Ok(existing),
            Ok(None) => Ok(value.to_string()),
            Err(e) => {
                warn!("Redis SET NX error for {}: {}", key, e);
                Ok(value.to_string())
            }
        }
    }

    async fn incr(&self, key: &str, ttl: Duration) -> CacheResult<i64> {
        let full_key = self.build_key(key);
        let mut conn = self.client.clone();

        match conn.incr::<_, _, i64>(&full_key, 1).await {
            Ok(count) => {
                if count == 1
                    && let Err(e) = conn
                        .expire::<_, ()>(&full_key, ttl.as_secs() as i64)
                        .await
                {
                    warn!("Redis EXPIRE error for {}: {}", key, e);
                }
                Ok(count)
            }
            Err(e) => {
                warn!("Redis INCR error for {}: {}", key, e);
                Ok(0)
            }
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let full_key = self.build_key(key);
        let mut conn = self.client.clone();

        if let Err(e) = conn.del::<_, i32>(&full_key).await {
            warn!("Redis DEL error for {}: {}", key, e);
        }
        Ok(())
    }

    async fn add_to_set(&self, key: &str, member: &str, ttl: Duration) -> CacheResult<()> {
        let full_key = self.build_key(key);
        let mut conn = self.client.clone();

        if let Err(e) = conn.sadd::<_, _, i32>(&full_key, member).await {
            warn!("Redis SADD error for {}: {}", key, e);
            return Ok(());
        }
        if let Err(e) = conn
            .expire::<_, ()>(&full_key, ttl.as_secs() as i64)
            .await
        {
            warn!("Redis EXPIRE error for {}: {}", key, e);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> CacheResult<Vec<String>> {
        let full_key = self.build_key(key);
        let mut conn = self.client.clone();

        match conn.smembers::<_, Vec<String>>(&full_key).await {
            Ok(members) => Ok(members),
            Err(e) => {
                error!("Redis SMEMBERS error for {}: {}", key, e);
                Ok(Vec::new())
            }
        }
    }

    async fn try_lock(&self, key: &str, token: &str, ttl: Duration) -> CacheResult<bool> {
        let full_key = self.build_key(key);
        let mut conn = self.client.clone();

        let options = SetOptions::default()
            .conditional_set(ExistenceCheck::NX)
            .with_expiration(SetExpiry::PX(ttl.as_millis() as u64));

        match conn
            .set_options::<_, _, Option<String>>(&full_key, token, options)
            .await
        {
            Ok(reply) => Ok(reply.is_some()),
            Err(e) => {
                warn!("Redis lock error for {}: {}", key, e);
                Ok(true)
            }
        }
    }

    async fn release_lock(&self, key: &str, token: &str) -> CacheResult<bool> {
        let full_key = self.build_key(key);
        let mut conn = self.client.clone();

        match Script::new(RELEASE_LOCK_SCRIPT)
            .key(&full_key)
            .arg(token)
            .invoke_async::<i64>(&mut conn)
            .await
        {
            Ok(removed) => Ok(removed > 0),
            Err(e) => {
                warn!("Redis lock release error for {}: {}", key, e);
                Ok(false)
            }
        }
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
