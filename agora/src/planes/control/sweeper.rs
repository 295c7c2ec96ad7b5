use crate::planes::data::api_cache::ApiCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Run `cleanup()` every `every` until `shutdown` is cancelled.
/// The first sweep happens one full interval after spawning.
pub fn spawn_sweeper(
    cache: Arc<ApiCache>,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Cache sweeper running every {:?}", every);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = cache.cleanup().await;
                    debug!("Cache sweep removed {} expired entries", removed);
                }
            }
        }

        info!("Cache sweeper stopped");
    })
}
