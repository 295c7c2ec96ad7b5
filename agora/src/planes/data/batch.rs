use crate::planes::data::api_cache::ApiCache;
use futures::StreamExt;
use futures::future::join_all;
use futures::stream;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::TtlMs;
use shared::config::CacheSettings;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use storage_engine::CacheParams;
use tracing::{debug, warn};

/// Turns N single-entity status lookups into one cached, concurrent,
/// fault-tolerant call.
#[derive(Clone, Debug)]
pub struct BatchResolver {
    cache: Arc<ApiCache>,
    max_in_flight: Option<usize>,
}

impl BatchResolver {
    pub fn new(cache: Arc<ApiCache>) -> Self {
        Self {
            cache,
            max_in_flight: None,
        }
    }

    /// Resolver honouring the configured in-flight limit
    pub fn from_settings(cache: Arc<ApiCache>, settings: &CacheSettings) -> Self {
        Self::new(cache).with_max_in_flight(settings.batch_max_in_flight)
    }

    /// Cap the number of lookups running at once within a single batch
    pub fn with_max_in_flight(mut self, limit: Option<usize>) -> Self {
        self.max_in_flight = limit.filter(|n| *n > 0);
        self
    }

    pub fn cache(&self) -> &Arc<ApiCache> {
        &self.cache
    }

    /// Resolve a status for every id in `ids`.
    ///
    /// The result has exactly one entry per distinct id. An id whose lookup
    /// fails is logged and mapped to `V::default()`; the batch itself never
    /// fails. The full map, defaults included, is cached under a key built
    /// from the sorted distinct ids, so the same id set in any order is
    /// served from one entry.
    pub async fn resolve_batch<S, V, E, F, Fut>(
        &self,
        ids: &[S],
        fetch_one: F,
        prefix: &str,
        ttl: TtlMs,
    ) -> HashMap<String, V>
    where
        S: AsRef<str>,
        V: Serialize + DeserializeOwned + Default,
        E: Display,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let unique: BTreeSet<String> = ids.iter().map(|id| id.as_ref().to_string()).collect();

        match unique.len() {
            0 => HashMap::new(),
            1 => {
                let id = unique.into_iter().next().unwrap_or_default();
                let value = self.resolve_one(&id, &fetch_one, prefix, ttl).await;
                HashMap::from([(id, value)])
            }
            _ => self.resolve_many(unique, &fetch_one, prefix, ttl).await,
        }
    }

    async fn resolve_one<V, E, F, Fut>(&self, id: &str, fetch_one: &F, prefix: &str, ttl: TtlMs) -> V
    where
        V: Serialize + DeserializeOwned + Default,
        E: Display,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let params = CacheParams::new().with("id", id);
        match self
            .cache
            .cached(prefix, || fetch_one(id.to_string()), &params, Some(ttl))
            .await
        {
            Ok(value) => value,
            Err(e) => {
                warn!("Status lookup for '{}' under '{}' failed, using default: {}", id, prefix, e);
                V::default()
            }
        }
    }

    async fn resolve_many<V, E, F, Fut>(
        &self,
        unique: BTreeSet<String>,
        fetch_one: &F,
        prefix: &str,
        ttl: TtlMs,
    ) -> HashMap<String, V>
    where
        V: Serialize + DeserializeOwned + Default,
        E: Display,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let params = CacheParams::new().with_list("ids", &unique);

        if let Some(hit) = self.cache.get::<HashMap<String, V>>(prefix, &params).await {
            if hit.len() == unique.len() && unique.iter().all(|id| hit.contains_key(id)) {
                return hit;
            }
            debug!("Cached batch under '{}' does not cover the requested ids, refetching", prefix);
        }

        let lookups = unique.into_iter().map(|id| {
            let lookup = fetch_one(id.clone());
            async move { (id, lookup.await) }
        });
        let outcomes: Vec<(String, Result<V, E>)> = match self.max_in_flight {
            Some(limit) => stream::iter(lookups).buffer_unordered(limit).collect().await,
            None => join_all(lookups).await,
        };

        let mut failures = 0;
        let mut results = HashMap::with_capacity(outcomes.len());
        for (id, outcome) in outcomes {
            let value = match outcome {
                Ok(value) => value,
                Err(e) => {
                    failures += 1;
                    warn!("Status lookup for '{}' under '{}' failed, using default: {}", id, prefix, e);
                    V::default()
                }
            };
            results.insert(id, value);
        }

        debug!(
            "Resolved batch of {} under '{}' ({} failed)",
            results.len(),
            prefix,
            failures
        );
        self.cache.set(prefix, &results, &params, Some(ttl)).await;
        results
    }
}
