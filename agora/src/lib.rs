pub mod domain;
pub mod events;
pub mod planes;
pub mod ports;

pub use planes::control::{Invalidator, spawn_sweeper};
pub use planes::data::{ApiCache, BatchResolver, StatusService};
pub use storage_engine::{CacheKey, CacheParams};
