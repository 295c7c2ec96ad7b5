pub mod invalidation;
pub mod sweeper;

pub use invalidation::Invalidator;
pub use sweeper::spawn_sweeper;
