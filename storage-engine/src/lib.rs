pub mod entry;
pub mod sled_tier;
pub mod tier;
pub mod transient;

pub use entry::{CacheEntry, CacheKey, CacheParams, encode_component};
pub use sled_tier::SledTier;
pub use tier::CacheTier;
pub use transient::TransientTier;
