//! Session Status Poller
//!
//! Background task that reconciles helper-process session state into the
//! job queue. Helpers write progress files on their own schedule; the
//! poller reads them at a fixed interval and turns them into job
//! updates, so all state transitions flow through one place.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{info, warn};

use super::{JobQueue, JobUpdate};

/// Runs the polling loop until the shutdown signal fires.
pub(crate) async fn run(queue: JobQueue, interval: Duration, shutdown: Arc<Notify>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    info!("Status poller started ({}ms interval)", interval.as_millis());

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = ticker.tick() => {
                // The shutdown notification only wakes waiters that were
                // already registered, so a signal sent before this task
                // first polls would be lost without the flag check.
                if queue.is_shut_down() {
                    break;
                }
                poll_once(&queue).await;
            }
        }
    }
    info!("Status poller shutting down");
}

/// One polling pass over every rendering job.
pub(crate) async fn poll_once(queue: &JobQueue) {
    for (job_id, task) in queue.rendering_tasks() {
        let session = task.session();

        if session.is_complete() {
            queue.apply_update(JobUpdate::completed(&job_id)).await;
            if let Err(e) = session.remove_session_dir() {
                warn!("Failed to remove session dir for job {}: {}", job_id, e);
            }
            continue;
        }

        if let Some(status) = session.read_status() {
            queue
                .apply_update(JobUpdate::rendering(
                    &job_id,
                    status.fraction as f32,
                    status.elapsed_sec,
                    &task.name(),
                ))
                .await;
        }
        // No status yet: the helper starts and stops on its own, and we
        // may poll before its first write or after its last. Not an error.
    }
}
