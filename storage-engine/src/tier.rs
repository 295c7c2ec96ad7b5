use crate::entry::{CacheEntry, CacheKey};
use async_trait::async_trait;
use shared::Result;

/// Port for one layer of the API cache (e.g. in-memory, sled).
///
/// Tiers store entries as written and report them back as-is; deciding
/// whether an entry is still fresh is the caller's job, except for
/// `purge_expired` which sweeps by the given time.
#[async_trait]
pub trait CacheTier: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    async fn write(&self, key: &CacheKey, entry: CacheEntry) -> Result<()>;

    async fn remove(&self, key: &CacheKey) -> Result<bool>;

    /// Remove every entry whose canonical key contains `pattern`,
    /// returning the removed keys
    async fn remove_matching(&self, pattern: &str) -> Result<Vec<CacheKey>>;

    /// Remove entries that are no longer valid at `now_ms`, returning the
    /// removed keys
    async fn purge_expired(&self, now_ms: u64) -> Result<Vec<CacheKey>>;

    async fn len(&self) -> Result<usize>;

    async fn clear(&self) -> Result<()>;
}
