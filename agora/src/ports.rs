#![deny(clippy::all)]

use crate::domain::Category;
use async_trait::async_trait;
use shared::Result;

/// Port for the single-entity lookups the backend API offers.
/// Implementations perform one network call per method invocation; the
/// status service batches and caches on top of them.
#[async_trait]
pub trait CommunityApi: Send + Sync + 'static {
    async fn comment_count(&self, post_id: &str) -> Result<u64>;

    async fn like_count(&self, post_id: &str) -> Result<u64>;

    async fn is_liked(&self, post_id: &str, user_id: &str) -> Result<bool>;

    async fn is_following(&self, follower_id: &str, target_id: &str) -> Result<bool>;

    async fn is_participating(&self, activity_id: &str, user_id: &str) -> Result<bool>;

    async fn category(&self, category_id: &str) -> Result<Category>;
}
