use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::transient::{remove_expired, BlobTable};

/// Start the background task that deletes expired blobs every `every`.
/// Returns a JoinHandle for graceful shutdown.
pub(crate) fn spawn_sweeper(
    entries: BlobTable,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sweep_interval = interval_at(Instant::now() + every, every);
        sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("Blob sweeper stopped");
                    break;
                }
                _ = sweep_interval.tick() => {
                    let removed = remove_expired(&entries).await;
                    if removed > 0 {
                        tracing::info!(removed, "Swept expired transient blobs");
                    } else {
                        tracing::debug!("Blob sweep found nothing to remove");
                    }
                }
            }
        }
    })
}
