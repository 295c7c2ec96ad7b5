use serde::{Deserialize, Serialize};
use shared::TtlMs;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Namespace for records written to the durable tier
pub const STORAGE_KEY_PREFIX: &str = "api_cache_";

/// Percent-encode one key component so the `? : & ,` delimiters and `%`
/// itself never appear raw inside a value.
pub fn encode_component(raw: &str) -> Cow<'_, str> {
    urlencoding::encode(raw)
}

/// Parameters of a cached request. Backed by an ordered map so the
/// canonical key never depends on insertion order. Values are held in
/// their encoded form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheParams(BTreeMap<String, String>);

impl CacheParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.insert(name, value);
        self
    }

    /// List-valued parameter: each item is encoded, then joined with `,`
    pub fn with_list<I, T>(mut self, name: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let joined = items
            .into_iter()
            .map(|item| encode_component(item.as_ref()).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        self.0.insert(name.into(), joined);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
        let value = value.to_string();
        self.0.insert(name.into(), encode_component(&value).into_owned());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Canonical cache key: `prefix` alone, or `prefix?k1:v1&k2:v2` with keys sorted
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(prefix: &str, params: &CacheParams) -> Self {
        if params.is_empty() {
            return Self(prefix.to_string());
        }

        let canonical = params
            .0
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        Self(format!("{}?{}", prefix, canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, pattern: &str) -> bool {
        self.0.contains(pattern)
    }

    /// Key under which the durable tier stores this entry
    pub fn storage_key(&self) -> String {
        format!("{}{}", STORAGE_KEY_PREFIX, self.0)
    }

    pub fn from_storage_key(raw: &str) -> Option<Self> {
        raw.strip_prefix(STORAGE_KEY_PREFIX)
            .map(|k| Self(k.to_string()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored value with its write time and lifetime, both in milliseconds.
/// Serialized as `{ "data", "timestamp", "ttl" }` in the durable tier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: serde_json::Value,
    pub timestamp: u64,
    pub ttl: u64,
}

impl CacheEntry {
    pub fn new(data: serde_json::Value, timestamp: u64, ttl: TtlMs) -> Self {
        Self {
            data,
            timestamp,
            ttl: ttl.0,
        }
    }

    /// Valid iff `now - timestamp < ttl`
    pub fn is_valid_at(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.timestamp) < self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_ignores_param_insertion_order() {
        let ab = CacheParams::new().with("a", 1).with("b", 2);
        let ba = CacheParams::new().with("b", 2).with("a", 1);

        assert_eq!(CacheKey::new("stats", &ab), CacheKey::new("stats", &ba));
        assert_eq!(CacheKey::new("stats", &ab).as_str(), "stats?a:1&b:2");
    }

    #[test]
    fn test_key_without_params_is_prefix() {
        let key = CacheKey::new("categories", &CacheParams::new());
        assert_eq!(key.as_str(), "categories");
    }

    #[test]
    fn test_storage_key_round_trip() {
        let key = CacheKey::new("x", &CacheParams::new().with("id", "a"));
        let stored = key.storage_key();

        assert_eq!(stored, "api_cache_x?id:a");
        assert_eq!(CacheKey::from_storage_key(&stored), Some(key));
        assert_eq!(CacheKey::from_storage_key("other_x"), None);
    }

    #[test]
    fn test_delimiters_in_values_never_collide() {
        let split = CacheParams::new().with_list("ids", ["a", "b", "c"]);
        let joined = CacheParams::new().with_list("ids", ["a,b", "c"]);
        assert_ne!(CacheKey::new("likes", &split), CacheKey::new("likes", &joined));
        assert_eq!(CacheKey::new("likes", &split).as_str(), "likes?ids:a,b,c");
        assert_eq!(CacheKey::new("likes", &joined).as_str(), "likes?ids:a%2Cb,c");

        let smuggled = CacheParams::new().with("a", "1&b:2");
        let honest = CacheParams::new().with("a", 1).with("b", 2);
        assert_ne!(CacheKey::new("x", &smuggled), CacheKey::new("x", &honest));

        let escaped = CacheParams::new().with("id", "%2C");
        let comma = CacheParams::new().with("id", ",");
        assert_ne!(CacheKey::new("x", &escaped), CacheKey::new("x", &comma));
    }

    #[test]
    fn test_entry_validity_window() {
        let entry = CacheEntry::new(json!(5), 1_000, TtlMs(100));

        assert!(entry.is_valid_at(1_000));
        assert!(entry.is_valid_at(1_099));
        assert!(!entry.is_valid_at(1_100));
    }

    #[test]
    fn test_entry_with_zero_ttl_is_never_valid() {
        let entry = CacheEntry::new(json!(true), 1_000, TtlMs(0));
        assert!(!entry.is_valid_at(1_000));
    }

    #[test]
    fn test_entry_json_layout() {
        let entry = CacheEntry::new(json!({"count": 3}), 42, TtlMs(60_000));
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value, json!({"data": {"count": 3}, "timestamp": 42, "ttl": 60000}));
    }
}
