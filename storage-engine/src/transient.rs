use crate::entry::{CacheEntry, CacheKey};
use crate::tier::CacheTier;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared::Result;
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;

#[derive(Default)]
struct Slots {
    entries: HashMap<CacheKey, CacheEntry>,
    // Insertion order, oldest first. Overwrites keep their original slot.
    order: VecDeque<CacheKey>,
}

impl Slots {
    fn forget(&mut self, key: &CacheKey) -> bool {
        let existed = self.entries.remove(key).is_some();
        if existed {
            self.order.retain(|k| k != key);
        }
        existed
    }
}

/// Fast in-process tier with a fixed item capacity and FIFO eviction
pub struct TransientTier {
    capacity: usize,
    slots: Mutex<Slots>,
}

impl TransientTier {
    /// Create a tier holding at most `capacity` entries. A capacity of 0
    /// disables the tier: writes are dropped.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Keys in insertion order, oldest first
    #[cfg(test)]
    fn keys(&self) -> Vec<CacheKey> {
        self.slots.lock().order.iter().cloned().collect()
    }
}

#[async_trait]
impl CacheTier for TransientTier {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        Ok(self.slots.lock().entries.get(key).cloned())
    }

    async fn write(&self, key: &CacheKey, entry: CacheEntry) -> Result<()> {
        if self.capacity == 0 {
            return Ok(());
        }

        let mut slots = self.slots.lock();
        if let Some(existing) = slots.entries.get_mut(key) {
            *existing = entry;
            return Ok(());
        }

        if slots.entries.len() >= self.capacity {
            if let Some(oldest) = slots.order.pop_front() {
                slots.entries.remove(&oldest);
                tracing::debug!("Evicted oldest memory entry '{}'", oldest);
            }
        }

        slots.order.push_back(key.clone());
        slots.entries.insert(key.clone(), entry);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.slots.lock().forget(key))
    }

    async fn remove_matching(&self, pattern: &str) -> Result<Vec<CacheKey>> {
        let mut slots = self.slots.lock();
        let doomed: Vec<CacheKey> = slots
            .entries
            .keys()
            .filter(|k| k.matches(pattern))
            .cloned()
            .collect();

        for key in &doomed {
            slots.forget(key);
        }
        Ok(doomed)
    }

    async fn purge_expired(&self, now_ms: u64) -> Result<Vec<CacheKey>> {
        let mut slots = self.slots.lock();
        let doomed: Vec<CacheKey> = slots
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_valid_at(now_ms))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &doomed {
            slots.forget(key);
        }
        Ok(doomed)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.slots.lock().entries.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut slots = self.slots.lock();
        slots.entries.clear();
        slots.order.clear();
        Ok(())
    }
}

impl Debug for TransientTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransientTier")
            .field("capacity", &self.capacity)
            .field("entry_count", &self.slots.lock().entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::CacheParams;
    use serde_json::json;
    use shared::TtlMs;

    fn key(id: &str) -> CacheKey {
        CacheKey::new("likes", &CacheParams::new().with("id", id))
    }

    fn entry(value: i64, timestamp: u64, ttl: u64) -> CacheEntry {
        CacheEntry::new(json!(value), timestamp, TtlMs(ttl))
    }

    #[tokio::test]
    async fn test_transient_write_and_read() {
        let tier = TransientTier::new(10);

        tier.write(&key("p1"), entry(3, 0, 1000)).await.unwrap();

        let found = tier.read(&key("p1")).await.unwrap().unwrap();
        assert_eq!(found.data, json!(3));
        assert!(tier.read(&key("p2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transient_evicts_oldest_inserted() {
        let tier = TransientTier::new(2);

        tier.write(&key("a"), entry(1, 0, 1000)).await.unwrap();
        tier.write(&key("b"), entry(2, 0, 1000)).await.unwrap();

        // Reading "a" must not protect it: eviction is FIFO, not LRU
        tier.read(&key("a")).await.unwrap();
        tier.write(&key("c"), entry(3, 0, 1000)).await.unwrap();

        assert!(tier.read(&key("a")).await.unwrap().is_none());
        assert_eq!(tier.keys(), vec![key("b"), key("c")]);
        assert_eq!(tier.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_transient_overwrite_does_not_evict() {
        let tier = TransientTier::new(2);

        tier.write(&key("a"), entry(1, 0, 1000)).await.unwrap();
        tier.write(&key("b"), entry(2, 0, 1000)).await.unwrap();
        tier.write(&key("a"), entry(10, 5, 1000)).await.unwrap();

        assert_eq!(tier.len().await.unwrap(), 2);
        assert_eq!(tier.read(&key("a")).await.unwrap().unwrap().data, json!(10));
        assert_eq!(tier.keys(), vec![key("a"), key("b")]);
    }

    #[tokio::test]
    async fn test_transient_zero_capacity_stores_nothing() {
        let tier = TransientTier::new(0);

        tier.write(&key("a"), entry(1, 0, 1000)).await.unwrap();
        assert_eq!(tier.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transient_remove_matching() {
        let tier = TransientTier::new(10);

        tier.write(&key("post-1"), entry(1, 0, 1000)).await.unwrap();
        tier.write(&key("post-2"), entry(2, 0, 1000)).await.unwrap();
        let batch = CacheKey::new("comments", &CacheParams::new().with_list("ids", ["post-1", "post-3"]));
        tier.write(&batch, entry(3, 0, 1000)).await.unwrap();

        let removed = tier.remove_matching("post-1").await.unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(tier.keys(), vec![key("post-2")]);
    }

    #[tokio::test]
    async fn test_transient_purge_expired_keeps_fresh() {
        let tier = TransientTier::new(10);

        tier.write(&key("old"), entry(1, 0, 100)).await.unwrap();
        tier.write(&key("new"), entry(2, 50, 100)).await.unwrap();

        let removed = tier.purge_expired(120).await.unwrap();
        assert_eq!(removed, vec![key("old")]);
        assert!(tier.read(&key("old")).await.unwrap().is_none());
        assert!(tier.read(&key("new")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_transient_remove_and_clear() {
        let tier = TransientTier::new(10);

        tier.write(&key("a"), entry(1, 0, 1000)).await.unwrap();
        tier.write(&key("b"), entry(2, 0, 1000)).await.unwrap();

        assert!(tier.remove(&key("a")).await.unwrap());
        assert!(!tier.remove(&key("a")).await.unwrap());

        tier.clear().await.unwrap();
        assert_eq!(tier.len().await.unwrap(), 0);
        assert!(tier.keys().is_empty());
    }
}
