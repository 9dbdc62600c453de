use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::TtlStore;
use crate::clock::{SharedClock, to_delta};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Process-local [`TtlStore`] whose expiry follows the injected clock.
///
/// For tests and single-instance development; counters are not shared
/// between processes.
#[derive(Debug, Clone)]
pub struct InMemoryTtlStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    clock: SharedClock,
}

impl InMemoryTtlStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    async fn live(&self, key: &str) -> Option<Entry> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        entries.get(key).filter(|e| e.is_live(now)).cloned()
    }

    /// Number of live keys. Test helper.
    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| e.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TtlStore for InMemoryTtlStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let expires_at = self.clock.now() + to_delta(ttl);
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(expires_at),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.live(key).await.map(|e| e.value))
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.live(key).await.is_some())
    }

    async fn delete(&self, keys: &[String]) -> StoreResult<u64> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let removed = keys
            .iter()
            .filter_map(|k| entries.remove(k))
            .filter(|e| e.is_live(now))
            .count();
        Ok(removed as u64)
    }

    async fn increment(&self, key: &str, first_ttl: Duration) -> StoreResult<i64> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        let current = entries.get(key).filter(|e| e.is_live(now)).cloned();
        let (count, expires_at) = match current {
            Some(entry) => {
                let n: i64 = entry.value.parse().map_err(|_| {
                    StoreError::Unavailable(format!("value at {} is not an integer", key))
                })?;
                (n + 1, entry.expires_at.or(Some(now + to_delta(first_ttl))))
            }
            None => (1, Some(now + to_delta(first_ttl))),
        };

        entries.insert(
            key.to_string(),
            Entry {
                value: count.to_string(),
                expires_at,
            },
        );
        Ok(count)
    }

    async fn remaining_ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        let now = self.clock.now();
        Ok(self
            .live(key)
            .await
            .and_then(|e| e.expires_at)
            .and_then(|at| (at - now).to_std().ok()))
    }
}
