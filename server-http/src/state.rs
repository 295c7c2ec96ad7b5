use agora::ApiCache;
use agora::events::CacheEvent;
use shared::config::Config;
use std::sync::Arc;
use storage_engine::{CacheTier, SledTier};
use tokio::sync::broadcast;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ApiCache>,
    pub event_channel: broadcast::Sender<CacheEvent>,
}

impl AppState {
    /// Build the cache from configuration. If the durable tier cannot be
    /// opened the cache runs memory-only.
    pub fn from_config(config: &Config) -> Self {
        let durable: Option<Arc<dyn CacheTier>> = match SledTier::open(config.cache_db_path()) {
            Ok(tier) => {
                tracing::info!(
                    "Durable cache tier opened at {}",
                    config.cache_db_path().display()
                );
                Some(Arc::new(tier))
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to open durable cache tier: {}. Running in-memory mode.",
                    e
                );
                None
            }
        };

        // Create broadcast channel for SSE events (1000 event buffer capacity)
        let (event_tx, _event_rx) = broadcast::channel(1000);

        let cache = ApiCache::new(&config.cache, durable).with_event_broadcaster(event_tx.clone());
        Self::new(Arc::new(cache), event_tx)
    }

    pub fn new(cache: Arc<ApiCache>, event_channel: broadcast::Sender<CacheEvent>) -> Self {
        Self {
            cache,
            event_channel,
        }
    }
}
