pub mod events;
pub mod health;
pub mod maintenance;

pub use events::stream_events;
pub use health::health_check;
pub use maintenance::{cache_stats, cleanup, invalidate, reset};
