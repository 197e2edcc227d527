use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// Key-value collaborator with per-key TTL. Injected rather than ambient so
/// tests can run against the in-memory implementation deterministically.
pub trait KeyValueCache: Send + Sync {
    fn get(&self, key: &str) -> Option<serde_json::Value>;
    fn set(&self, key: &str, value: serde_json::Value, ttl: Duration);
    /// Increments a numeric counter under `key`, creating it with the given
    /// TTL if absent. Returns the new value.
    fn increment(&self, key: &str, ttl: Duration) -> i64;
    fn delete(&self, key: &str);
}

struct Entry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// Process-local TTL store. Expired entries are dropped lazily on read.
#[derive(Default)]
pub struct InMemoryTtlCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryTtlCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueCache for InMemoryTtlCache {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) {
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn increment(&self, key: &str, ttl: Duration) -> i64 {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        let current = match entries.get(key) {
            Some(entry) if entry.expires_at > now => entry.value.as_i64().unwrap_or(0),
            _ => 0,
        };
        let next = current + 1;
        // keep the original expiry when the counter already exists
        let expires_at = match entries.get(key) {
            Some(entry) if entry.expires_at > now => entry.expires_at,
            _ => now + ttl,
        };
        entries.insert(
            key.to_string(),
            Entry {
                value: serde_json::Value::from(next),
                expires_at,
            },
        );
        next
    }

    fn delete(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

/// The per-user computations the result cache memoizes, each with its own TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationKind {
    Dashboard,
    Statistics,
    Recommendations,
    Notifications,
}

impl ComputationKind {
    pub fn ttl(self) -> Duration {
        match self {
            ComputationKind::Dashboard => Duration::from_secs(5 * 60),
            ComputationKind::Statistics => Duration::from_secs(30 * 60),
            ComputationKind::Recommendations => Duration::from_secs(60 * 60),
            ComputationKind::Notifications => Duration::from_secs(15 * 60),
        }
    }

    fn key(self, user_id: Uuid) -> String {
        let kind = match self {
            ComputationKind::Dashboard => "dashboard",
            ComputationKind::Statistics => "statistics",
            ComputationKind::Recommendations => "recommendations",
            ComputationKind::Notifications => "notifications",
        };
        format!("insights:{kind}:{user_id}")
    }
}

/// Per-user, per-kind memoization over the injected store. A hit within the
/// TTL is returned verbatim; misses are recomputed by the caller and stored.
/// No single-flight: concurrent misses may both compute, last write wins.
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn KeyValueCache>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn KeyValueCache>) -> Self {
        Self { store }
    }

    pub fn get<T: DeserializeOwned>(&self, kind: ComputationKind, user_id: Uuid) -> Option<T> {
        let value = self.store.get(&kind.key(user_id))?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                tracing::warn!(error = %err, ?kind, "cached value failed to decode, recomputing");
                None
            }
        }
    }

    pub fn store<T: Serialize>(&self, kind: ComputationKind, user_id: Uuid, value: &T) {
        match serde_json::to_value(value) {
            Ok(encoded) => self.store.set(&kind.key(user_id), encoded, kind.ttl()),
            Err(err) => {
                tracing::warn!(error = %err, ?kind, "failed to encode result for caching");
            }
        }
    }

    pub fn invalidate(&self, kind: ComputationKind, user_id: Uuid) {
        self.store.delete(&kind.key(user_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn set_then_get_within_ttl() {
        let cache = InMemoryTtlCache::new();
        cache.set("k", serde_json::json!({"a": 1}), Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(serde_json::json!({"a": 1})));
    }

    #[test]
    fn expired_entries_are_gone() {
        let cache = InMemoryTtlCache::new();
        cache.set("k", serde_json::json!(1), Duration::from_millis(5));
        sleep(Duration::from_millis(20));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn increment_counts_up_from_zero() {
        let cache = InMemoryTtlCache::new();
        assert_eq!(cache.increment("n", Duration::from_secs(60)), 1);
        assert_eq!(cache.increment("n", Duration::from_secs(60)), 2);
        cache.delete("n");
        assert_eq!(cache.increment("n", Duration::from_secs(60)), 1);
    }

    #[test]
    fn result_cache_round_trips_per_user_and_kind() {
        let store = Arc::new(InMemoryTtlCache::new());
        let cache = ResultCache::new(store);
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();

        cache.store(ComputationKind::Statistics, user, &vec![1, 2, 3]);
        assert_eq!(
            cache.get::<Vec<i32>>(ComputationKind::Statistics, user),
            Some(vec![1, 2, 3])
        );
        // distinct user and distinct kind are both misses
        assert_eq!(cache.get::<Vec<i32>>(ComputationKind::Statistics, other), None);
        assert_eq!(cache.get::<Vec<i32>>(ComputationKind::Dashboard, user), None);

        cache.invalidate(ComputationKind::Statistics, user);
        assert_eq!(cache.get::<Vec<i32>>(ComputationKind::Statistics, user), None);
    }
}
