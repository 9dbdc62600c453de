use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};

use super::repository::SessionRepository;
use super::service::SessionManager;

/// Runs `purge_now` every `interval` until `shutdown` resolves.
///
/// The first sweep happens one interval after start. A failed sweep is logged
/// and retried on the next tick.
pub fn spawn_purge_job<R, F>(
    manager: Arc<SessionManager<R>>,
    interval: Duration,
    shutdown: F,
) -> JoinHandle<()>
where
    R: SessionRepository + ?Sized + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let interval = interval.max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(interval_secs = interval.as_secs(), "Session purge job started");
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Received shutdown signal, stopping session purge job");
                    break;
                }
                _ = ticker.tick() => {
                    match manager.purge_now().await {
                        Ok(0) => {}
                        Ok(purged) => info!(purged, "Purged expired and revoked sessions"),
                        Err(e) => error!(error = %e, "Session purge failed"),
                    }
                }
            }
        }
    })
}
