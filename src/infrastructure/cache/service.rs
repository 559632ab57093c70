//! Cache service trait and error types.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Errors that can occur during cache operations.
#[derive(Debug)]
pub enum CacheError {
    ConnectionError(String),
    OperationError(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Cache connection error: {}", e),
            Self::OperationError(e) => write!(f, "Cache operation error: {}", e),
        }
    }
}

impl std::error::Error for CacheError {}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Shared key/value store for short-lived state: captcha codes, login error
/// counters, the daily mail log and request locks.
///
/// Implementations must be thread-safe. Production implementations fail open:
/// backend errors are logged and degrade to "nothing stored" instead of
/// failing the request.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed, shared across instances
/// - [`crate::infrastructure::cache::MemoryCache`] - Process-local fallback and test double
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Reads a string value.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Writes a string value, replacing any previous one.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()>;

    /// Returns the stored value, or stores `value` and returns it when the key is absent.
    async fn get_or_insert(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<String>;

    /// Increments a counter and returns the new value.
    ///
    /// `ttl` is applied when the counter is created.
    async fn incr(&self, key: &str, ttl: Duration) -> CacheResult<i64>;

    /// Removes a key of any type.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Adds a member to a set and (re)sets the set's expiry.
    async fn add_to_set(&self, key: &str, member: &str, ttl: Duration) -> CacheResult<()>;

    /// Returns all members of a set.
    async fn set_members(&self, key: &str) -> CacheResult<Vec<String>>;

    /// Acquires an exclusive lock key owned by `token`. Returns `false` when
    /// someone else holds it.
    async fn try_lock(&self, key: &str, token: &str, ttl: Duration) -> CacheResult<bool>;

    /// Releases a lock only while it is still owned by `token`.
    ///
    /// Returns `true` when the lock was removed.
    async fn release_lock(&self, key: &str, token: &str) -> CacheResult<bool>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;

    /// Short backend name for health reports.
    fn backend(&self) -> &'static str;
}
