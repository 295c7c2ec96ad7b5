use crate::entry::{CacheEntry, CacheKey, STORAGE_KEY_PREFIX};
use crate::tier::CacheTier;
use async_trait::async_trait;
use shared::{Error, Result};
use std::path::Path;

const TREE_NAME: &str = "api_cache";

/// Sled-backed durable tier. Survives process restarts; each entry is a
/// JSON `{ data, timestamp, ttl }` record under `api_cache_<canonicalKey>`.
pub struct SledTier {
    tree: sled::Tree,
}

impl SledTier {
    /// Open (or create) the durable tier at `path`.
    /// Creates the parent directory if it doesn't exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("Failed to create directory: {}", e)))?;
        }

        let db = sled::open(path)?;
        Self::from_db(&db)
    }

    /// In-memory sled instance that is removed on drop, for tests and
    /// throwaway processes
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(&db)
    }

    pub fn from_db(db: &sled::Db) -> Result<Self> {
        Ok(Self {
            tree: db.open_tree(TREE_NAME)?,
        })
    }

    fn decode(bytes: &[u8]) -> Result<CacheEntry> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Walk every cache record, removing those `doomed` selects
    fn remove_where<F>(&self, mut doomed: F) -> Result<Vec<CacheKey>>
    where
        F: FnMut(&CacheKey, &[u8]) -> bool,
    {
        let mut removed = Vec::new();
        for item in self.tree.scan_prefix(STORAGE_KEY_PREFIX) {
            let (raw_key, value) = item?;
            let Some(key) = std::str::from_utf8(&raw_key)
                .ok()
                .and_then(CacheKey::from_storage_key)
            else {
                continue;
            };

            if doomed(&key, &*value) && self.tree.remove(&raw_key)?.is_some() {
                removed.push(key);
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl CacheTier for SledTier {
    fn name(&self) -> &'static str {
        "sled"
    }

    async fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let storage_key = key.storage_key();
        match self.tree.get(storage_key.as_bytes())? {
            Some(bytes) => match Self::decode(&bytes) {
                Ok(entry) => Ok(Some(entry)),
                Err(e) => {
                    // Unreadable records would fail forever; drop them
                    self.tree.remove(storage_key.as_bytes())?;
                    Err(e)
                }
            },
            None => Ok(None),
        }
    }

    async fn write(&self, key: &CacheKey, entry: CacheEntry) -> Result<()> {
        let value = serde_json::to_vec(&entry)?;
        self.tree.insert(key.storage_key().as_bytes(), value)?;
        self.tree.flush_async().await?;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool> {
        let removed = self.tree.remove(key.storage_key().as_bytes())?.is_some();
        Ok(removed)
    }

    async fn remove_matching(&self, pattern: &str) -> Result<Vec<CacheKey>> {
        self.remove_where(|key, _| key.matches(pattern))
    }

    async fn purge_expired(&self, now_ms: u64) -> Result<Vec<CacheKey>> {
        self.remove_where(|_, bytes| match Self::decode(bytes) {
            Ok(entry) => !entry.is_valid_at(now_ms),
            Err(_) => true,
        })
    }

    async fn len(&self) -> Result<usize> {
        let mut count = 0;
        for item in self.tree.scan_prefix(STORAGE_KEY_PREFIX).keys() {
            item?;
            count += 1;
        }
        Ok(count)
    }

    async fn clear(&self) -> Result<()> {
        self.remove_where(|_, _| true)?;
        Ok(())
    }
}

impl std::fmt::Debug for SledTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledTier")
            .field("tree", &TREE_NAME)
            .finish()
    }
}
