//! Two-tier look-aside cache: an in-process moka tier in front of a durable
//! tier. A miss in both tiers plants a `<key>_null` marker so repeated misses
//! stop hitting the database. Any tier failure degrades to a miss with a
//! warning; callers always fall through to the source of truth.

use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgPool;

use crate::db::{self, cache::CacheRow};

const MEMORY_CAPACITY: u64 = 10_000;

/// How long a negative marker suppresses durable-tier lookups.
const NULL_MARKER_TTL: Duration = Duration::from_secs(600);

fn null_key(key: &str) -> String {
    format!("{key}_null")
}

#[derive(Clone)]
struct MemoryEntry {
    value: String,
    deadline: Option<Instant>,
}

/// In-process cache tier. Entries expire lazily: the deadline is checked on
/// read, moka's LRU handles capacity.
#[derive(Clone)]
pub struct MemoryTier {
    entries: moka::sync::Cache<String, MemoryEntry>,
}

impl MemoryTier {
    pub fn new() -> Self {
        MemoryTier {
            entries: moka::sync::Cache::new(MEMORY_CAPACITY),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if let Some(deadline) = entry.deadline {
            if Instant::now() >= deadline {
                self.entries.invalidate(key);
                return None;
            }
        }
        Some(entry.value)
    }

    pub fn set(&self, key: &str, value: String, ttl: Option<Duration>) {
        let deadline = ttl.map(|t| Instant::now() + t);
        self.entries
            .insert(key.to_string(), MemoryEntry { value, deadline });
    }

    pub fn remove(&self, key: &str) {
        self.entries.invalidate(key);
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new()
    }
}

/// Durable backing tier. Production uses [`PgTier`] over the
/// `key_value_cache` table; tests substitute an in-memory map.
pub trait DurableTier: Clone + Send + Sync + 'static {
    fn find(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<CacheRow>, sqlx::Error>> + Send;

    fn upsert(
        &self,
        key: &str,
        value: &serde_json::Value,
        expires_at: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

/// Postgres durable tier.
#[derive(Clone)]
pub struct PgTier {
    pool: PgPool,
}

impl PgTier {
    pub fn new(pool: PgPool) -> Self {
        PgTier { pool }
    }
}

impl DurableTier for PgTier {
    async fn find(&self, key: &str) -> Result<Option<CacheRow>, sqlx::Error> {
        db::cache::find_entry(&self.pool, key).await
    }

    async fn upsert(
        &self,
        key: &str,
        value: &serde_json::Value,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), sqlx::Error> {
        db::cache::upsert_entry(&self.pool, key, value, expires_at).await
    }

    async fn delete(&self, key: &str) -> Result<(), sqlx::Error> {
        db::cache::delete_entry(&self.pool, key).await
    }
}

#[derive(Clone)]
pub struct LookAsideCache<D: DurableTier = PgTier> {
    memory: MemoryTier,
    durable: D,
}

impl LookAsideCache {
    pub fn new(pool: PgPool) -> Self {
        Self::with_tier(PgTier::new(pool))
    }
}

impl<D: DurableTier> LookAsideCache<D> {
    pub fn with_tier(durable: D) -> Self {
        LookAsideCache {
            memory: MemoryTier::new(),
            durable,
        }
    }

    /// Read through both tiers. A hit in the durable tier repopulates the
    /// memory tier with the remaining lifetime; a miss in both plants a
    /// negative marker.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if self.memory.get(&null_key(key)).is_some() {
            return None;
        }

        if let Some(raw) = self.memory.get(key) {
            match serde_json::from_str(&raw) {
                Ok(value) => return Some(value),
                Err(err) => {
                    tracing::warn!(key, error = %err, "dropping undecodable cache entry");
                    self.memory.remove(key);
                }
            }
        }

        match self.durable.find(key).await {
            Ok(Some(row)) => {
                let remaining = row
                    .expires_at
                    .and_then(|at| (at - Utc::now()).to_std().ok());
                if row.expires_at.is_some() && remaining.is_none() {
                    // Durable entry already expired.
                    self.memory
                        .set(&null_key(key), "1".to_string(), Some(NULL_MARKER_TTL));
                    return None;
                }
                self.memory.set(key, row.value.to_string(), remaining);
                match serde_json::from_value(row.value) {
                    Ok(value) => Some(value),
                    Err(err) => {
                        tracing::warn!(key, error = %err, "undecodable durable cache entry");
                        None
                    }
                }
            }
            Ok(None) => {
                self.memory
                    .set(&null_key(key), "1".to_string(), Some(NULL_MARKER_TTL));
                None
            }
            Err(err) => {
                tracing::warn!(key, error = %err, "cache lookup failed, treating as miss");
                None
            }
        }
    }

    /// Write through both tiers and clear any negative marker.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        self.memory.remove(&null_key(key));

        let json = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(key, error = %err, "unserializable cache value");
                return;
            }
        };

        let expires_at = ttl
            .and_then(|t| chrono::Duration::from_std(t).ok())
            .map(|d| Utc::now() + d);
        if let Err(err) = self.durable.upsert(key, &json, expires_at).await {
            tracing::warn!(key, error = %err, "cache write-through failed");
        }

        self.memory.set(key, json.to_string(), ttl);
    }

    /// Invalidate both tiers and the negative marker.
    pub async fn delete(&self, key: &str) {
        self.memory.remove(key);
        self.memory.remove(&null_key(key));
        if let Err(err) = self.durable.delete(key).await {
            tracing::warn!(key, error = %err, "cache delete failed");
        }
    }

    /// Fire-and-forget invalidation for keys off the request's hot path.
    pub fn delete_background(&self, key: &str) {
        let cache = self.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            cache.delete(&key).await;
        });
    }
}
