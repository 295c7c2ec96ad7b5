pub mod api_cache;
pub mod batch;
pub mod status;

pub use api_cache::ApiCache;
pub use batch::BatchResolver;
pub use status::StatusService;
