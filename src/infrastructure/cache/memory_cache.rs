//! Process-local cache implementation.

use super::service::{CacheResult, CacheService};
use async_trait::async_trait;
use moka::Expiry;
use moka::sync::Cache;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::debug;

/// Upper bound on stored keys; least recently used keys go first.
const MAX_ENTRIES: u64 = 100_000;

#[derive(Clone)]
enum Value {
    Text(String),
    Set(HashSet<String>),
}

#[derive(Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn text(value: &str, expires_at: Option<Instant>) -> Self {
        Self {
            value: Value::Text(value.to_string()),
            expires_at,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match &self.value {
            Value::Text(s) => Some(s),
            Value::Set(_) => None,
        }
    }
}

/// Expires each entry at its own deadline.
struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        created_at: Instant,
    ) -> Option<Duration> {
        entry
            .expires_at
            .map(|at| at.saturating_duration_since(created_at))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry
            .expires_at
            .map(|at| at.saturating_duration_since(updated_at))
    }
}

/// A cache held in process memory.
///
/// Used when Redis is not configured or unreachable at startup, and as the
/// cache in tests. Entries expire individually and are evicted by moka's
/// housekeeping, so keys written once and never read again don't pile up.
pub struct MemoryCache {
    entries: Cache<String, Entry>,
    /// Serializes read-modify-write operations.
    write: Mutex<()>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .expire_after(EntryExpiry)
                .build(),
            write: Mutex::new(()),
        }
    }
}

impl MemoryCache {
    /// Creates an empty MemoryCache.
    pub fn new() -> Self {
        debug!("Using MemoryCache (process-local)");
        Self::default()
    }

    /// Number of live entries after pending evictions have run.
    pub fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    fn text(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .and_then(|entry| entry.as_text().map(str::to_string))
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.text(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let expires_at = ttl.map(|t| Instant::now() + t);
        self.entries
            .insert(key.to_string(), Entry::text(value, expires_at));
        Ok(())
    }

    async fn get_or_insert(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<String> {
        let _guard = self.write.lock();
        if let Some(existing) = self.text(key) {
            return Ok(existing);
        }
        self.entries.insert(
            key.to_string(),
            Entry::text(value, Some(Instant::now() + ttl)),
        );
        Ok(value.to_string())
    }

    async fn incr(&self, key: &str, ttl: Duration) -> CacheResult<i64> {
        let _guard = self.write.lock();
        let now = Instant::now();
        let (current, expires_at) = match self.entries.get(key) {
            Some(entry) => match entry.as_text() {
                Some(s) => (s.parse::<i64>().unwrap_or(0), entry.expires_at),
                None => (0, Some(now + ttl)),
            },
            None => (0, Some(now + ttl)),
        };
        let next = current + 1;
        self.entries
            .insert(key.to_string(), Entry::text(&next.to_string(), expires_at));
        Ok(next)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.invalidate(key);
        Ok(())
    }

    async fn add_to_set(&self, key: &str, member: &str, ttl: Duration) -> CacheResult<()> {
        let _guard = self.write.lock();
        let mut set = match self.entries.get(key).map(|e| e.value) {
            Some(Value::Set(set)) => set,
            _ => HashSet::new(),
        };
        set.insert(member.to_string());
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Set(set),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn set_members(&self, key: &str) -> CacheResult<Vec<String>> {
        Ok(match self.entries.get(key).map(|e| e.value) {
            Some(Value::Set(set)) => set.into_iter().collect(),
            _ => Vec::new(),
        })
    }

    async fn try_lock(&self, key: &str, token: &str, ttl: Duration) -> CacheResult<bool> {
        let _guard = self.write.lock();
        if self.entries.contains_key(key) {
            return Ok(false);
        }
        self.entries.insert(
            key.to_string(),
            Entry::text(token, Some(Instant::now() + ttl)),
        );
        Ok(true)
    }

    async fn release_lock(&self, key: &str, token: &str) -> CacheResult<bool> {
        let _guard = self.write.lock();
        if self.text(key).as_deref() != Some(token) {
            return Ok(false);
        }
        self.entries.invalidate(key);
        Ok(true)
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
