use crate::domain::CacheStats;
use crate::events::{
    CacheEvent, EntryRemovedEvent, EntryStoredEvent, PatternInvalidatedEvent, SweptEvent,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::config::CacheSettings;
use shared::{Clock, SystemClock, TtlMs};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use storage_engine::{CacheEntry, CacheKey, CacheParams, CacheTier, TransientTier};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Two-tier TTL cache for API lookups.
///
/// Reads check the fast tier, then the durable tier (promoting fresh hits
/// back into the fast tier). Writes go to both. Any tier failure is logged
/// and treated as a miss or a skipped write; callers never see it.
pub struct ApiCache {
    memory: Arc<dyn CacheTier>,
    durable: Option<Arc<dyn CacheTier>>,
    default_ttl: TtlMs,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    event_broadcaster: Option<broadcast::Sender<CacheEvent>>,
}

impl ApiCache {
    pub fn new(settings: &CacheSettings, durable: Option<Arc<dyn CacheTier>>) -> Self {
        Self::with_tiers(
            Arc::new(TransientTier::new(settings.memory_items)),
            durable,
            settings.default_ttl,
        )
    }

    /// Cache without a durable tier
    pub fn memory_only(settings: &CacheSettings) -> Self {
        Self::new(settings, None)
    }

    pub fn with_tiers(
        memory: Arc<dyn CacheTier>,
        durable: Option<Arc<dyn CacheTier>>,
        default_ttl: TtlMs,
    ) -> Self {
        Self {
            memory,
            durable,
            default_ttl,
            clock: Arc::new(SystemClock),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            event_broadcaster: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_broadcaster(mut self, broadcaster: broadcast::Sender<CacheEvent>) -> Self {
        self.event_broadcaster = Some(broadcaster);
        self
    }

    /// Look up a fresh value. Misses, expired entries and payloads that no
    /// longer decode as `V` all come back as `None`.
    pub async fn get<V: DeserializeOwned>(&self, prefix: &str, params: &CacheParams) -> Option<V> {
        let key = CacheKey::new(prefix, params);
        let found = self.lookup(&key).await;

        match found.and_then(|entry| self.decode::<V>(&key, entry)) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for '{}'", key);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for '{}'", key);
                None
            }
        }
    }

    /// Store `value` in both tiers for `ttl` (or the default TTL)
    pub async fn set<V: Serialize>(
        &self,
        prefix: &str,
        value: &V,
        params: &CacheParams,
        ttl: Option<TtlMs>,
    ) {
        let key = CacheKey::new(prefix, params);
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(e) => {
                warn!("Not caching '{}': value does not serialize: {}", key, e);
                return;
            }
        };

        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry = CacheEntry::new(data, self.clock.now_ms(), ttl);

        if let Err(e) = self.memory.write(&key, entry.clone()).await {
            warn!("Failed to write '{}' to {} tier: {}", key, self.memory.name(), e);
        }
        if let Some(durable) = &self.durable {
            if let Err(e) = durable.write(&key, entry).await {
                warn!("Failed to write '{}' to {} tier: {}", key, durable.name(), e);
            }
        }

        self.emit(CacheEvent::Stored(EntryStoredEvent {
            key: key.to_string(),
            ttl_ms: ttl.0,
            timestamp: self.clock.now_ms(),
        }));
    }

    pub async fn delete(&self, prefix: &str, params: &CacheParams) {
        let key = CacheKey::new(prefix, params);
        self.remove_key(&key).await;

        self.emit(CacheEvent::Removed(EntryRemovedEvent {
            key: key.to_string(),
            timestamp: self.clock.now_ms(),
        }));
    }

    /// Remove every entry whose canonical key contains `pattern`.
    /// Returns the number of distinct keys removed.
    pub async fn invalidate_pattern(&self, pattern: &str) -> usize {
        let mut removed = BTreeSet::new();
        for tier in self.tiers() {
            match tier.remove_matching(pattern).await {
                Ok(keys) => removed.extend(keys),
                Err(e) => warn!("Failed to invalidate '{}' in {} tier: {}", pattern, tier.name(), e),
            }
        }

        debug!("Invalidated {} entries matching '{}'", removed.len(), pattern);
        self.emit(CacheEvent::Invalidated(PatternInvalidatedEvent {
            pattern: pattern.to_string(),
            removed: removed.len(),
            timestamp: self.clock.now_ms(),
        }));
        removed.len()
    }

    /// Drop expired entries from both tiers. Returns the number of distinct
    /// keys removed.
    pub async fn cleanup(&self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = BTreeSet::new();
        for tier in self.tiers() {
            match tier.purge_expired(now).await {
                Ok(keys) => removed.extend(keys),
                Err(e) => warn!("Failed to sweep {} tier: {}", tier.name(), e),
            }
        }

        self.emit(CacheEvent::Swept(SweptEvent {
            removed: removed.len(),
            timestamp: now,
        }));
        removed.len()
    }

    /// Return the cached value, or run `fetch`, cache its result and return
    /// it. A failed fetch is returned as-is and nothing is cached.
    pub async fn cached<V, E, F, Fut>(
        &self,
        prefix: &str,
        fetch: F,
        params: &CacheParams,
        ttl: Option<TtlMs>,
    ) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(prefix, params).await {
            return Ok(value);
        }

        let value = fetch().await?;
        self.set(prefix, &value, params, ttl).await;
        Ok(value)
    }

    pub async fn stats(&self) -> CacheStats {
        let memory_items = self.memory.len().await.unwrap_or_else(|e| {
            warn!("Failed to count {} tier: {}", self.memory.name(), e);
            0
        });
        let storage_items = match &self.durable {
            Some(durable) => durable.len().await.unwrap_or_else(|e| {
                warn!("Failed to count {} tier: {}", durable.name(), e);
                0
            }),
            None => 0,
        };

        CacheStats {
            memory_items,
            storage_items,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Empty both tiers and zero the counters
    pub async fn reset(&self) {
        for tier in self.tiers() {
            if let Err(e) = tier.clear().await {
                warn!("Failed to clear {} tier: {}", tier.name(), e);
            }
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    fn tiers(&self) -> impl Iterator<Item = &Arc<dyn CacheTier>> {
        std::iter::once(&self.memory).chain(self.durable.iter())
    }

    async fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = self.clock.now_ms();

        match self.memory.read(key).await {
            Ok(Some(entry)) if entry.is_valid_at(now) => return Some(entry),
            Ok(Some(_)) => self.forget(self.memory.as_ref(), key).await,
            Ok(None) => {}
            Err(e) => warn!("Failed to read '{}' from {} tier: {}", key, self.memory.name(), e),
        }

        let durable = self.durable.as_ref()?;
        match durable.read(key).await {
            Ok(Some(entry)) if entry.is_valid_at(now) => {
                if let Err(e) = self.memory.write(key, entry.clone()).await {
                    warn!("Failed to promote '{}' into {} tier: {}", key, self.memory.name(), e);
                }
                Some(entry)
            }
            Ok(Some(_)) => {
                self.forget(durable.as_ref(), key).await;
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read '{}' from {} tier: {}", key, durable.name(), e);
                None
            }
        }
    }

    fn decode<V: DeserializeOwned>(&self, key: &CacheKey, entry: CacheEntry) -> Option<V> {
        match serde_json::from_value(entry.data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring cached '{}': unexpected shape: {}", key, e);
                None
            }
        }
    }

    async fn forget(&self, tier: &dyn CacheTier, key: &CacheKey) {
        if let Err(e) = tier.remove(key).await {
            warn!("Failed to remove '{}' from {} tier: {}", key, tier.name(), e);
        }
    }

    async fn remove_key(&self, key: &CacheKey) {
        for tier in self.tiers() {
            self.forget(tier.as_ref(), key).await;
        }
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(ref broadcaster) = self.event_broadcaster {
            match broadcaster.send(event) {
                Ok(subscriber_count) => {
                    tracing::trace!("Broadcast cache event to {} subscriber(s)", subscriber_count);
                }
                Err(_) => {
                    tracing::trace!("No subscribers for cache event");
                }
            }
        }
    }
}

impl std::fmt::Debug for ApiCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCache")
            .field("memory", &self.memory.name())
            .field("durable", &self.durable.as_ref().map(|d| d.name()))
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
