use serde::{Deserialize, Serialize};

/// Cache-key prefixes and lifetimes for each status family
pub mod status {
    use shared::TtlMs;
    use storage_engine::encode_component;

    pub const COMMENT_COUNTS: &str = "comment_counts";
    pub const LIKE_COUNTS: &str = "like_counts";
    pub const LIKE_STATUS: &str = "like_status";
    pub const FOLLOW_STATUS: &str = "follow_status";
    pub const PARTICIPATION: &str = "participation";
    pub const CATEGORIES: &str = "categories";

    pub const COMMENT_COUNTS_TTL: TtlMs = TtlMs::from_mins(2);
    pub const LIKE_COUNTS_TTL: TtlMs = TtlMs::from_mins(1);
    pub const LIKE_STATUS_TTL: TtlMs = TtlMs::from_mins(1);
    pub const FOLLOW_STATUS_TTL: TtlMs = TtlMs::from_mins(5);
    pub const PARTICIPATION_TTL: TtlMs = TtlMs::from_mins(2);
    pub const CATEGORIES_TTL: TtlMs = TtlMs::from_mins(30);

    /// Prefix for statuses that depend on who is looking
    pub fn per_viewer(prefix: &str, viewer_id: &str) -> String {
        format!("{}_{}", prefix, encode_component(viewer_id))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub memory_items: usize,
    pub storage_items: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}
