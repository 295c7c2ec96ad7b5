use crate::domain::Category;
use crate::domain::status::{self, per_viewer};
use crate::planes::data::batch::BatchResolver;
use crate::ports::CommunityApi;
use std::collections::HashMap;
use std::sync::Arc;

/// Batch status lookups for list views, one method per status family.
#[derive(Clone)]
pub struct StatusService {
    api: Arc<dyn CommunityApi>,
    resolver: BatchResolver,
}

impl StatusService {
    pub fn new(api: Arc<dyn CommunityApi>, resolver: BatchResolver) -> Self {
        Self { api, resolver }
    }

    pub async fn comment_counts<S: AsRef<str>>(&self, post_ids: &[S]) -> HashMap<String, u64> {
        let api = self.api.clone();
        self.resolver
            .resolve_batch(
                post_ids,
                move |id| {
                    let api = api.clone();
                    async move { api.comment_count(&id).await }
                },
                status::COMMENT_COUNTS,
                status::COMMENT_COUNTS_TTL,
            )
            .await
    }

    pub async fn like_counts<S: AsRef<str>>(&self, post_ids: &[S]) -> HashMap<String, u64> {
        let api = self.api.clone();
        self.resolver
            .resolve_batch(
                post_ids,
                move |id| {
                    let api = api.clone();
                    async move { api.like_count(&id).await }
                },
                status::LIKE_COUNTS,
                status::LIKE_COUNTS_TTL,
            )
            .await
    }

    /// Whether `viewer_id` has liked each post
    pub async fn like_status<S: AsRef<str>>(
        &self,
        viewer_id: &str,
        post_ids: &[S],
    ) -> HashMap<String, bool> {
        let api = self.api.clone();
        let viewer = viewer_id.to_string();
        self.resolver
            .resolve_batch(
                post_ids,
                move |id| {
                    let api = api.clone();
                    let viewer = viewer.clone();
                    async move { api.is_liked(&id, &viewer).await }
                },
                &per_viewer(status::LIKE_STATUS, viewer_id),
                status::LIKE_STATUS_TTL,
            )
            .await
    }

    /// Whether `viewer_id` follows each target user
    pub async fn follow_status<S: AsRef<str>>(
        &self,
        viewer_id: &str,
        target_ids: &[S],
    ) -> HashMap<String, bool> {
        let api = self.api.clone();
        let viewer = viewer_id.to_string();
        self.resolver
            .resolve_batch(
                target_ids,
                move |id| {
                    let api = api.clone();
                    let viewer = viewer.clone();
                    async move { api.is_following(&viewer, &id).await }
                },
                &per_viewer(status::FOLLOW_STATUS, viewer_id),
                status::FOLLOW_STATUS_TTL,
            )
            .await
    }

    /// Whether `viewer_id` takes part in each activity
    pub async fn participation_status<S: AsRef<str>>(
        &self,
        viewer_id: &str,
        activity_ids: &[S],
    ) -> HashMap<String, bool> {
        let api = self.api.clone();
        let viewer = viewer_id.to_string();
        self.resolver
            .resolve_batch(
                activity_ids,
                move |id| {
                    let api = api.clone();
                    let viewer = viewer.clone();
                    async move { api.is_participating(&id, &viewer).await }
                },
                &per_viewer(status::PARTICIPATION, viewer_id),
                status::PARTICIPATION_TTL,
            )
            .await
    }

    /// Category records; unknown or failed ids map to `None`
    pub async fn categories<S: AsRef<str>>(
        &self,
        category_ids: &[S],
    ) -> HashMap<String, Option<Category>> {
        let api = self.api.clone();
        self.resolver
            .resolve_batch(
                category_ids,
                move |id| {
                    let api = api.clone();
                    async move { api.category(&id).await.map(Some) }
                },
                status::CATEGORIES,
                status::CATEGORIES_TTL,
            )
            .await
    }
}

impl std::fmt::Debug for StatusService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusService")
            .field("resolver", &self.resolver)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planes::data::api_cache::ApiCache;
    use async_trait::async_trait;
    use shared::config::CacheSettings;
    use shared::{Error, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend stand-in: posts "p<n>" have n comments and 10*n likes,
    /// user "u1" likes even posts and follows "u2", "bad" always fails.
    #[derive(Default)]
    struct FakeApi {
        calls: AtomicUsize,
    }

    impl FakeApi {
        fn number(post_id: &str) -> Result<u64> {
            post_id
                .strip_prefix('p')
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| Error::Fetch(format!("no such post {}", post_id)))
        }
    }

    #[async_trait]
    impl CommunityApi for FakeApi {
        async fn comment_count(&self, post_id: &str) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Self::number(post_id)
        }

        async fn like_count(&self, post_id: &str) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Self::number(post_id).map(|n| n * 10)
        }

        async fn is_liked(&self, post_id: &str, user_id: &str) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(user_id == "u1" && Self::number(post_id)? % 2 == 0)
        }

        async fn is_following(&self, follower_id: &str, target_id: &str) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match target_id {
                "bad" => Err(Error::Fetch("timeout".into())),
                _ => Ok(follower_id == "u1" && target_id == "u2"),
            }
        }

        async fn is_participating(&self, activity_id: &str, user_id: &str) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(activity_id == "a1" && user_id == "u1")
        }

        async fn category(&self, category_id: &str) -> Result<Category> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match category_id {
                "news" => Ok(Category {
                    id: "news".into(),
                    name: "News".into(),
                    description: None,
                }),
                _ => Err(Error::NotFound),
            }
        }
    }

    fn service() -> (StatusService, Arc<FakeApi>) {
        let api = Arc::new(FakeApi::default());
        let cache = Arc::new(ApiCache::memory_only(&CacheSettings::default()));
        (StatusService::new(api.clone(), BatchResolver::new(cache)), api)
    }

    #[tokio::test]
    async fn test_comment_and_like_counts() {
        let (service, _api) = service();

        let comments = service.comment_counts(&["p1", "p2", "oops"]).await;
        assert_eq!(comments["p1"], 1);
        assert_eq!(comments["p2"], 2);
        assert_eq!(comments["oops"], 0);

        let likes = service.like_counts(&["p3"]).await;
        assert_eq!(likes["p3"], 30);
    }

    #[tokio::test]
    async fn test_like_status_is_per_viewer() {
        let (service, _api) = service();

        let mine = service.like_status("u1", &["p1", "p2"]).await;
        let theirs = service.like_status("u9", &["p1", "p2"]).await;

        assert!(!mine["p1"]);
        assert!(mine["p2"]);
        assert!(!theirs["p2"]);
    }

    #[tokio::test]
    async fn test_follow_status_absorbs_failures() {
        let (service, _api) = service();

        let follows = service.follow_status("u1", &["u2", "u3", "bad"]).await;
        assert_eq!(follows.len(), 3);
        assert!(follows["u2"]);
        assert!(!follows["u3"]);
        assert!(!follows["bad"]);
    }

    #[tokio::test]
    async fn test_participation_and_categories() {
        let (service, _api) = service();

        let joined = service.participation_status("u1", &["a1", "a2"]).await;
        assert!(joined["a1"]);
        assert!(!joined["a2"]);

        let categories = service.categories(&["news", "gone"]).await;
        assert_eq!(categories["news"].as_ref().map(|c| c.name.as_str()), Some("News"));
        assert_eq!(categories["gone"], None);
    }

    #[tokio::test]
    async fn test_repeat_render_is_served_from_cache() {
        let (service, api) = service();

        service.comment_counts(&["p1", "p2", "p3"]).await;
        service.comment_counts(&["p3", "p1", "p2"]).await;

        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    }
}
