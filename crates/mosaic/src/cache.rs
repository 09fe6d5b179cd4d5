//! TTL-bounded artifact cache for retrieval results.
//!
//! Uses `DashMap` so independent retrieval pipelines can read and write
//! concurrently; a single key is always guarded by one shard lock, which
//! keeps its get/set linearizable. The cache is advisory: a write that
//! cannot be stored is dropped, never surfaced to the caller.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Longest TTL honored; larger requests are clamped.
const MAX_TTL_MINUTES: u64 = 60 * 24 * 365;

/// Time source for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A stored value with its lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Point-in-time summary of the cache contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total: usize,
    /// Entries past their expiry that have not been swept yet.
    pub expired: usize,
    pub oldest_created_at: Option<DateTime<Utc>>,
}

/// Process-local cache keyed by request fingerprint.
pub struct ArtifactCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    max_entries: usize,
    clock: Arc<dyn Clock>,
    /// Serializes the capacity check with the insert so `max_entries` holds
    /// under concurrent writers.
    insert_lock: Mutex<()>,
}

impl<V> fmt::Debug for ArtifactCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactCache")
            .field("len", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

impl<V: Clone> ArtifactCache<V> {
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, Arc::new(SystemClock))
    }

    pub fn with_clock(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
            clock,
            insert_lock: Mutex::new(()),
        }
    }

    /// Look up a live entry. Expired entries are evicted on the way out.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();

        match self.entries.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => {}
        }

        // Re-check under the shard lock: a concurrent set may have refreshed it.
        if self.entries.remove_if(key, |_, e| e.is_expired(now)).is_some() {
            debug!("Cache entry {} expired, evicted", short_key(key));
        }
        None
    }

    /// Store `value` for `ttl_minutes`, replacing any previous entry.
    ///
    /// When the store is full, expired entries are swept and the write is
    /// retried once; if there is still no room the write is dropped.
    pub fn set(&self, key: impl Into<String>, value: V, ttl_minutes: u64) {
        let now = self.clock.now();
        let ttl = Duration::minutes(ttl_minutes.min(MAX_TTL_MINUTES) as i64);
        let entry = CacheEntry {
            key: key.into(),
            value,
            created_at: now,
            expires_at: now + ttl,
        };

        let Err(entry) = self.try_insert(entry) else {
            return;
        };

        let swept = self.clear_expired();
        debug!("Cache full, swept {} expired entries before retry", swept);

        if let Err(entry) = self.try_insert(entry) {
            warn!(
                "Cache full ({} entries), dropping write for {}",
                self.max_entries,
                short_key(&entry.key)
            );
        }
    }

    /// Evict every expired entry. Returns how many were removed.
    pub fn clear_expired(&self) -> usize {
        let now = self.clock.now();
        let mut evicted = 0;
        self.entries.retain(|_, entry| {
            if entry.is_expired(now) {
                evicted += 1;
                false
            } else {
                true
            }
        });
        evicted
    }

    /// Evict everything.
    pub fn clear(&self) {
        let count = self.entries.len();
        self.entries.clear();
        debug!("Cache cleared ({} entries)", count);
    }

    /// Evict a single key. Returns true if it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let mut stats = CacheStats {
            total: 0,
            expired: 0,
            oldest_created_at: None,
        };
        for entry in self.entries.iter() {
            stats.total += 1;
            if entry.is_expired(now) {
                stats.expired += 1;
            }
            stats.oldest_created_at = Some(match stats.oldest_created_at {
                Some(oldest) => oldest.min(entry.created_at),
                None => entry.created_at,
            });
        }
        stats
    }

    fn try_insert(&self, entry: CacheEntry<V>) -> Result<(), CacheEntry<V>> {
        // Only inserts grow the map, so holding this across check and insert
        // is enough; removals can only make room.
        let _guard = self
            .insert_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&entry.key) {
            return Err(entry);
        }
        self.entries.insert(entry.key.clone(), entry);
        Ok(())
    }
}

/// Periodically sweep expired entries until the task is aborted.
pub fn spawn_sweeper<V>(cache: Arc<ArtifactCache<V>>, every: StdDuration) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = cache.clear_expired();
            if evicted > 0 {
                debug!("Cache sweep: {} expired entries removed", evicted);
            }
        }
    })
}

fn short_key(key: &str) -> &str {
    key.get(..12).unwrap_or(key)
}
