//! Idempotency-key replay store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use proto::Envelope;
use tracing::debug;

/// Storage seam for envelopes keyed by caller-supplied idempotency keys.
///
/// Hosts with durable storage implement this trait; the adapter only needs
/// lookup and insert.
pub trait IdempotencyStore: Send + Sync {
    /// Returns the envelope recorded for `key`, if still valid.
    fn get(&self, key: &str) -> Option<Envelope>;
    /// Records `envelope` as the answer for `key`.
    fn put(&self, key: &str, envelope: Envelope);
}

#[derive(Debug, Clone)]
struct StoredEnvelope {
    envelope: Envelope,
    stored_at: DateTime<Utc>,
}

/// Number of inserts between sweeps of expired entries.
const PURGE_INTERVAL: usize = 64;

/// Process-local store backed by a concurrent map
///
/// Expired entries are swept every [`PURGE_INTERVAL`] inserts. With a
/// capacity set, the oldest entries are evicted once it is exceeded.
#[derive(Debug, Default)]
pub struct InMemoryIdempotencyStore {
    entries: DashMap<String, StoredEnvelope>,
    ttl: Option<TimeDelta>,
    max_entries: Option<usize>,
    puts: AtomicUsize,
}

impl InMemoryIdempotencyStore {
    /// Creates a store whose entries never expire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose entries expire `ttl` after insertion.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX)),
            ..Self::default()
        }
    }

    /// Caps the number of entries kept; zero means unbounded.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = (max_entries > 0).then_some(max_entries);
        self
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no entries are held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every expired entry.
    pub fn purge_expired(&self) {
        let now = Utc::now();
        self.entries.retain(|_, entry| !self.is_expired(entry, now));
    }

    fn evict_oldest(&self, max_entries: usize) {
        while self.entries.len() > max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.stored_at)
                .map(|entry| entry.key().clone());
            let Some(key) = oldest else {
                break;
            };
            self.entries.remove(&key);
            debug!(key, "Evicted oldest idempotency entry");
        }
    }

    fn is_expired(&self, entry: &StoredEnvelope, now: DateTime<Utc>) -> bool {
        self.ttl
            .is_some_and(|ttl| now.signed_duration_since(entry.stored_at) >= ttl)
    }
}

impl IdempotencyStore for InMemoryIdempotencyStore {
    fn get(&self, key: &str) -> Option<Envelope> {
        let now = Utc::now();
        if self
            .entries
            .remove_if(key, |_, entry| self.is_expired(entry, now))
            .is_some()
        {
            debug!(key, "Idempotency entry expired");
            return None;
        }
        self.entries.get(key).map(|entry| entry.envelope.clone())
    }

    fn put(&self, key: &str, envelope: Envelope) {
        self.entries.insert(
            key.to_string(),
            StoredEnvelope {
                envelope,
                stored_at: Utc::now(),
            },
        );

        let puts = self.puts.fetch_add(1, Ordering::Relaxed) + 1;
        let over_capacity = self.max_entries.filter(|max| self.entries.len() > *max);
        if puts % PURGE_INTERVAL == 0 || over_capacity.is_some() {
            self.purge_expired();
        }
        if let Some(max_entries) = over_capacity {
            self.evict_oldest(max_entries);
        }
    }
}
