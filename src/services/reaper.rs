use crate::services::exchange::ExchangeService;
use crate::services::pool::MatchingPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Periodically flip expired requests and idle sessions
///
/// Lazy expiry on access already keeps every read correct; this only keeps
/// listings and stored rows fresh.
pub fn spawn_reaper(
    pool: Arc<MatchingPool>,
    exchanges: Arc<ExchangeService>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            match pool.expire_stale_requests().await {
                Ok(0) => {}
                Ok(n) => tracing::info!("Reaper expired {} requests", n),
                Err(e) => tracing::error!("Reaper failed to sweep requests: {}", e),
            }

            match exchanges.expire_idle_sessions().await {
                Ok(0) => {}
                Ok(n) => tracing::info!("Reaper expired {} sessions", n),
                Err(e) => tracing::error!("Reaper failed to sweep sessions: {}", e),
            }
        }
    })
}
