use crate::domain::status;
use crate::planes::data::api_cache::ApiCache;
use std::sync::Arc;
use storage_engine::encode_component;
use tracing::info;

/// Cache invalidation to run after each successful backend write.
///
/// Patterns are bare entity ids so every batch key that mentions the
/// entity goes, whatever prefix or id set it was built with. Each hook
/// returns the number of entries removed.
#[derive(Clone, Debug)]
pub struct Invalidator {
    cache: Arc<ApiCache>,
}

impl Invalidator {
    pub fn new(cache: Arc<ApiCache>) -> Self {
        Self { cache }
    }

    pub async fn post_liked(&self, post_id: &str) -> usize {
        self.entity("post_liked", post_id).await
    }

    pub async fn post_unliked(&self, post_id: &str) -> usize {
        self.entity("post_unliked", post_id).await
    }

    pub async fn comment_added(&self, post_id: &str) -> usize {
        self.entity("comment_added", post_id).await
    }

    pub async fn comment_deleted(&self, post_id: &str) -> usize {
        self.entity("comment_deleted", post_id).await
    }

    /// A new post changes the author's listings
    pub async fn post_created(&self, author_id: &str) -> usize {
        self.entity("post_created", author_id).await
    }

    pub async fn post_deleted(&self, post_id: &str) -> usize {
        self.entity("post_deleted", post_id).await
    }

    pub async fn followed(&self, follower_id: &str, target_id: &str) -> usize {
        self.entity("followed", follower_id).await + self.entity("followed", target_id).await
    }

    pub async fn unfollowed(&self, follower_id: &str, target_id: &str) -> usize {
        self.entity("unfollowed", follower_id).await + self.entity("unfollowed", target_id).await
    }

    pub async fn activity_joined(&self, activity_id: &str) -> usize {
        self.entity("activity_joined", activity_id).await
    }

    pub async fn activity_left(&self, activity_id: &str) -> usize {
        self.entity("activity_left", activity_id).await
    }

    pub async fn categories_changed(&self) -> usize {
        self.entity("categories_changed", status::CATEGORIES).await
    }

    async fn entity(&self, mutation: &str, pattern: &str) -> usize {
        if pattern.is_empty() {
            // An empty pattern would match every key
            return 0;
        }

        // Ids appear encoded inside keys
        let removed = self.cache.invalidate_pattern(&encode_component(pattern)).await;
        info!("{}: invalidated {} cache entries matching '{}'", mutation, removed, pattern);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planes::data::batch::BatchResolver;
    use shared::config::CacheSettings;
    use shared::{Error, TtlMs};
    use storage_engine::CacheParams;

    fn cache() -> Arc<ApiCache> {
        Arc::new(ApiCache::memory_only(&CacheSettings::default()))
    }

    #[tokio::test]
    async fn test_comment_added_drops_every_batch_with_post() {
        let cache = cache();
        let resolver = BatchResolver::new(cache.clone());
        let fetch = |_id: String| async { Ok::<_, Error>(1u64) };

        resolver.resolve_batch(&["p1", "p2"], fetch, status::COMMENT_COUNTS, TtlMs(60_000)).await;
        resolver.resolve_batch(&["p2", "p3"], fetch, status::LIKE_COUNTS, TtlMs(60_000)).await;
        resolver.resolve_batch(&["p3", "p4"], fetch, status::LIKE_COUNTS, TtlMs(60_000)).await;

        let removed = Invalidator::new(cache.clone()).comment_added("p2").await;
        assert_eq!(removed, 2);
        assert_eq!(cache.stats().await.memory_items, 1);
    }

    #[tokio::test]
    async fn test_follow_invalidates_both_sides() {
        let cache = cache();
        cache
            .set("follow_status_u1", &true, &CacheParams::new().with("id", "u7"), None)
            .await;
        cache
            .set("profile", &"x", &CacheParams::new().with("id", "u2"), None)
            .await;
        cache
            .set("profile", &"y", &CacheParams::new().with("id", "u3"), None)
            .await;

        let removed = Invalidator::new(cache.clone()).followed("u1", "u2").await;
        assert_eq!(removed, 2);
        assert_eq!(cache.stats().await.memory_items, 1);
    }

    #[tokio::test]
    async fn test_ids_with_delimiters_are_matched_in_batches() {
        let cache = cache();
        let resolver = BatchResolver::new(cache.clone());
        let fetch = |_id: String| async { Ok::<_, Error>(true) };

        resolver.resolve_batch(&["team:red", "u9"], fetch, status::FOLLOW_STATUS, TtlMs(60_000)).await;
        resolver.resolve_batch(&["team:red"], fetch, status::FOLLOW_STATUS, TtlMs(60_000)).await;

        let removed = Invalidator::new(cache.clone()).followed("u1", "team:red").await;
        assert_eq!(removed, 2);
        assert_eq!(cache.stats().await.memory_items, 0);
    }

    #[tokio::test]
    async fn test_categories_changed_and_empty_id() {
        let cache = cache();
        cache
            .set(status::CATEGORIES, &vec!["news"], &CacheParams::new(), None)
            .await;
        cache.set("likes", &1, &CacheParams::new().with("id", "p1"), None).await;

        let invalidator = Invalidator::new(cache.clone());
        assert_eq!(invalidator.post_deleted("").await, 0);
        assert_eq!(invalidator.categories_changed().await, 1);
        assert_eq!(cache.stats().await.memory_items, 1);
    }
}
