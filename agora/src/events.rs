use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    Stored(EntryStoredEvent),
    Removed(EntryRemovedEvent),
    Invalidated(PatternInvalidatedEvent),
    Swept(SweptEvent),
}

impl CacheEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            CacheEvent::Stored(_) => "stored",
            CacheEvent::Removed(_) => "removed",
            CacheEvent::Invalidated(_) => "invalidated",
            CacheEvent::Swept(_) => "swept",
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            CacheEvent::Stored(e) => e.timestamp,
            CacheEvent::Removed(e) => e.timestamp,
            CacheEvent::Invalidated(e) => e.timestamp,
            CacheEvent::Swept(e) => e.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryStoredEvent {
    pub key: String,
    pub ttl_ms: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRemovedEvent {
    pub key: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternInvalidatedEvent {
    pub pattern: String,
    pub removed: usize,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweptEvent {
    pub removed: usize,
    pub timestamp: u64,
}
