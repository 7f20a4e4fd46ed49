//! Job Queue
//!
//! Shared, insertion-ordered list of render jobs with scheduling policy
//! (sequential by default, bounded-parallel opt-in), delayed cleanup of
//! finished rows, and an event channel for observers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tracing::{info, warn};

use crate::{CoreError, CoreResult, JobId};

use super::{poller, Job, JobEvent, JobKind, JobState, JobUpdate, RenderTask};

// =============================================================================
// Queue Configuration
// =============================================================================

/// Job queue configuration
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Render one job at a time, starting the next on completion
    pub render_sequentially: bool,
    /// Parallel-mode render slot bound; 0 means one per CPU
    pub max_concurrent_renders: usize,
    /// How long finished jobs stay visible before the removal sweep
    pub completed_removal_delay: Duration,
    /// Status poller interval
    pub poll_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            render_sequentially: true,
            max_concurrent_renders: 0,
            completed_removal_delay: Duration::from_millis(4000),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl QueueConfig {
    /// Number of jobs allowed to render at once
    pub fn render_slots(&self) -> usize {
        if self.render_sequentially {
            1
        } else if self.max_concurrent_renders == 0 {
            num_cpus::get()
        } else {
            self.max_concurrent_renders
        }
    }
}

// =============================================================================
// Job Queue
// =============================================================================

struct JobEntry {
    job: Job,
    task: Arc<dyn RenderTask>,
}

struct QueueInner {
    config: QueueConfig,
    /// Insertion-ordered job list; order is what a jobs panel shows
    jobs: Mutex<Vec<JobEntry>>,
    /// Finished jobs waiting for the delayed removal sweep
    remove_pending: Mutex<Vec<JobId>>,
    event_tx: mpsc::UnboundedSender<JobEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<JobEvent>>>,
    poller: Mutex<Option<tokio::task::JoinHandle<()>>>,
    shutdown: Arc<Notify>,
    idle: Notify,
    shut_down: AtomicBool,
}

/// Shared handle to the render job queue. Cheap to clone.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<QueueInner>,
}

impl JobQueue {
    /// Creates a queue with the given configuration
    pub fn new(config: QueueConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(QueueInner {
                config,
                jobs: Mutex::new(Vec::new()),
                remove_pending: Mutex::new(Vec::new()),
                event_tx,
                event_rx: Mutex::new(Some(event_rx)),
                poller: Mutex::new(None),
                shutdown: Arc::new(Notify::new()),
                idle: Notify::new(),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Creates a queue with default configuration
    pub fn with_defaults() -> Self {
        Self::new(QueueConfig::default())
    }

    /// Takes the event receiver (can only be called once)
    pub fn take_event_receiver(&self) -> Option<mpsc::UnboundedReceiver<JobEvent>> {
        self.inner.event_rx.lock().unwrap().take()
    }

    // =========================================================================
    // Adding and Starting Jobs
    // =========================================================================

    /// Adds a render task to the queue.
    ///
    /// The task starts immediately when a render slot is free; otherwise
    /// it waits until a running job finishes. The status poller is
    /// started lazily on the first add.
    pub async fn add_job(&self, task: Arc<dyn RenderTask>) -> CoreResult<JobId> {
        if self.inner.shut_down.load(Ordering::SeqCst) {
            return Err(CoreError::QueueShutDown);
        }

        let job = Job::new(task.kind(), &task.name());
        let job_id = job.id.clone();

        {
            let mut jobs = self.inner.jobs.lock().unwrap();
            self.emit(JobEvent::Added { job: job.clone() });
            jobs.push(JobEntry { job, task });
        }
        info!("Job {} added to queue", job_id);

        self.ensure_poller();
        self.fill_render_slots().await;

        Ok(job_id)
    }

    /// Starts queued jobs until the render slots are full.
    async fn fill_render_slots(&self) {
        loop {
            let next = {
                let mut jobs = self.inner.jobs.lock().unwrap();
                let rendering = jobs.iter().filter(|e| e.job.is_rendering()).count();
                if rendering >= self.inner.config.render_slots() {
                    None
                } else {
                    jobs.iter_mut()
                        .find(|e| e.job.state == JobState::Queued)
                        .map(|entry| {
                            entry.job.state = JobState::Rendering;
                            entry.job.text = "Render Starting...".to_string();
                            (entry.job.clone(), Arc::clone(&entry.task))
                        })
                }
            };

            let Some((job, task)) = next else {
                break;
            };

            self.emit(JobEvent::Updated { job: job.clone() });
            info!("Starting render for job {} ({})", job.id, job.name);

            if let Err(e) = task.start().await {
                warn!("Failed to start render for job {}: {}", job.id, e);
                let error = e.to_string();
                {
                    let mut jobs = self.inner.jobs.lock().unwrap();
                    if let Some(entry) = jobs.iter_mut().find(|e| e.job.id == job.id) {
                        entry.job.state = JobState::Failed;
                        entry.job.progress = -1.0;
                        entry.job.text = error.clone();
                        entry.job.completed_at = Some(chrono::Utc::now().to_rfc3339());
                        self.emit(JobEvent::Failed {
                            job: entry.job.clone(),
                            error,
                        });
                    }
                }
                self.schedule_removal(&job.id);
                // Loop continues so the slot goes to the next queued job.
            }
        }
    }

    // =========================================================================
    // Applying Updates
    // =========================================================================

    /// Applies a state report to the matching job.
    ///
    /// Updates for unknown ids are logged and dropped; updates arriving
    /// after cancellation are ignored. Completion and failure schedule
    /// the delayed removal sweep and hand the slot to the next queued
    /// job.
    pub async fn apply_update(&self, update: JobUpdate) {
        let finished = {
            let mut jobs = self.inner.jobs.lock().unwrap();
            let Some(entry) = jobs.iter_mut().find(|e| e.job.id == update.job_id) else {
                warn!("Update for unknown job {} dropped", update.job_id);
                return;
            };

            // Late helper updates can race a cancellation.
            if entry.job.state == JobState::Cancelled {
                return;
            }

            match update.state {
                JobState::Completed => {
                    entry.job.state = JobState::Completed;
                    entry.job.progress = 1.0;
                    entry.job.text = "Completed".to_string();
                    entry.job.completed_at = Some(chrono::Utc::now().to_rfc3339());
                    let output_path = entry
                        .task
                        .output_path()
                        .map(|p| p.to_string_lossy().to_string());
                    self.emit(JobEvent::Completed {
                        job: entry.job.clone(),
                        output_path,
                    });
                    info!("Job {} completed", entry.job.id);
                    true
                }
                JobState::Failed => {
                    let error = update
                        .text
                        .clone()
                        .unwrap_or_else(|| "Render failed".to_string());
                    entry.job.state = JobState::Failed;
                    entry.job.progress = -1.0;
                    entry.job.text = error.clone();
                    entry.job.completed_at = Some(chrono::Utc::now().to_rfc3339());
                    self.emit(JobEvent::Failed {
                        job: entry.job.clone(),
                        error,
                    });
                    warn!("Job {} failed", entry.job.id);
                    true
                }
                state => {
                    entry.job.state = state;
                    // Producers can render slightly past the end.
                    entry.job.progress = update.progress.min(1.0);
                    entry.job.elapsed_sec = update.elapsed_sec;
                    if let Some(text) = update.text {
                        entry.job.text = text;
                    }
                    self.emit(JobEvent::Updated {
                        job: entry.job.clone(),
                    });
                    false
                }
            }
        };

        if finished {
            self.schedule_removal(&update.job_id);
            self.fill_render_slots().await;
        }
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    /// Cancels one job, aborting its helper if it is rendering.
    pub async fn cancel_job(&self, job_id: &str) -> CoreResult<()> {
        let task = {
            let mut jobs = self.inner.jobs.lock().unwrap();
            let Some(entry) = jobs.iter_mut().find(|e| e.job.id == job_id) else {
                return Err(CoreError::JobNotFound(job_id.to_string()));
            };
            if entry.job.state.is_terminal() {
                return Ok(());
            }

            let was_rendering = entry.job.is_rendering();
            entry.job.state = JobState::Cancelled;
            entry.job.progress = -1.0;
            entry.job.text = "Cancelled".to_string();
            self.emit(JobEvent::Cancelled {
                job: entry.job.clone(),
            });
            was_rendering.then(|| Arc::clone(&entry.task))
        };

        if let Some(task) = task {
            if let Err(e) = task.abort().await {
                warn!("Abort for job {} failed: {}", job_id, e);
            }
        }

        info!("Job {} cancelled", job_id);
        self.schedule_removal(job_id);
        Ok(())
    }

    /// Cancels every job in the queue.
    pub async fn cancel_all(&self) {
        let tasks = {
            let mut jobs = self.inner.jobs.lock().unwrap();
            // Any previously scheduled sweep now covers everything.
            let mut remove = self.inner.remove_pending.lock().unwrap();
            remove.clear();

            let mut to_abort = Vec::new();
            for entry in jobs.iter_mut() {
                if entry.job.is_rendering() {
                    to_abort.push(Arc::clone(&entry.task));
                }
                if !entry.job.state.is_terminal() {
                    entry.job.state = JobState::Cancelled;
                }
                entry.job.progress = -1.0;
                entry.job.text = "Cancelled".to_string();
                self.emit(JobEvent::Cancelled {
                    job: entry.job.clone(),
                });
                remove.push(entry.job.id.clone());
            }
            to_abort
        };

        for task in tasks {
            if let Err(e) = task.abort().await {
                warn!("Abort during cancel-all failed: {}", e);
            }
        }

        info!("All jobs cancelled");
        self.spawn_removal_sweep();
    }

    // =========================================================================
    // Delayed Removal
    // =========================================================================

    /// Finished jobs stay visible for a while so the user notices the
    /// completion before the row disappears.
    fn schedule_removal(&self, job_id: &str) {
        self.inner
            .remove_pending
            .lock()
            .unwrap()
            .push(job_id.to_string());
        self.spawn_removal_sweep();
    }

    fn spawn_removal_sweep(&self) {
        let queue = self.clone();
        let delay = self.inner.config.completed_removal_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.sweep_removed().await;
        });
    }

    /// Removes jobs queued for removal, then hands freed slots to the
    /// next queued jobs.
    pub async fn sweep_removed(&self) {
        let removed: Vec<JobId> = {
            let mut jobs = self.inner.jobs.lock().unwrap();
            let pending: Vec<JobId> = self.inner.remove_pending.lock().unwrap().drain(..).collect();
            if pending.is_empty() {
                return;
            }

            let mut removed = Vec::new();
            jobs.retain(|entry| {
                if pending.contains(&entry.job.id) && entry.job.state.is_terminal() {
                    removed.push(entry.job.id.clone());
                    false
                } else {
                    true
                }
            });

            if jobs.is_empty() {
                self.inner.idle.notify_one();
            }
            removed
        };

        for job_id in removed {
            self.emit(JobEvent::Removed { job_id });
        }

        self.fill_render_slots().await;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Ordered snapshot of the queue for display
    pub fn snapshot(&self) -> Vec<Job> {
        self.inner
            .jobs
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.job.clone())
            .collect()
    }

    /// Gets a job by ID
    pub fn get_job(&self, job_id: &str) -> Option<Job> {
        self.inner
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.job.id == job_id)
            .map(|e| e.job.clone())
    }

    /// Number of jobs currently in the list
    pub fn active_count(&self) -> usize {
        self.inner.jobs.lock().unwrap().len()
    }

    /// Jobs currently in the given state
    pub fn jobs_with_state(&self, state: JobState) -> Vec<Job> {
        self.inner
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.job.state == state)
            .map(|e| e.job.clone())
            .collect()
    }

    /// Jobs of the given kind
    pub fn jobs_of_kind(&self, kind: JobKind) -> Vec<Job> {
        self.inner
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.job.kind == kind)
            .map(|e| e.job.clone())
            .collect()
    }

    /// Whether any proxy render is still in the queue. Proxy mode
    /// switches wait on this before re-converting the timeline.
    pub fn proxy_render_ongoing(&self) -> bool {
        !self.jobs_of_kind(JobKind::ProxyRender).is_empty()
    }

    /// Whether `shutdown()` has been called. Checked by the status
    /// poller on every tick.
    pub(crate) fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    /// Rendering jobs with their tasks, for the status poller
    pub(crate) fn rendering_tasks(&self) -> Vec<(JobId, Arc<dyn RenderTask>)> {
        self.inner
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.job.is_rendering())
            .map(|e| (e.job.id.clone(), Arc::clone(&e.task)))
            .collect()
    }

    // =========================================================================
    // Poller and Shutdown
    // =========================================================================

    fn ensure_poller(&self) {
        let mut guard = self.inner.poller.lock().unwrap();
        if guard.is_none() {
            let queue = self.clone();
            let interval = self.inner.config.poll_interval;
            let shutdown = Arc::clone(&self.inner.shutdown);
            *guard = Some(tokio::spawn(poller::run(queue, interval, shutdown)));
        }
    }

    /// Aborts every rendering job and stops the status poller. The
    /// queue refuses new jobs afterwards.
    pub async fn shutdown(&self) {
        self.inner.shut_down.store(true, Ordering::SeqCst);

        let tasks = self.rendering_tasks();
        for (job_id, task) in tasks {
            if let Err(e) = task.abort().await {
                warn!("Abort for job {} during shutdown failed: {}", job_id, e);
            }
        }

        self.inner.shutdown.notify_waiters();
        let handle = self.inner.poller.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        info!("Job queue shut down");
    }

    /// Waits until the queue has drained completely. Used by the
    /// renders-still-running flow after the main window closes.
    pub async fn wait_until_idle(&self) {
        loop {
            if self.inner.jobs.lock().unwrap().is_empty() {
                return;
            }
            self.inner.idle.notified().await;
        }
    }

    fn emit(&self, event: JobEvent) {
        let _ = self.inner.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::MockRenderTask;
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_config() -> QueueConfig {
        QueueConfig {
            render_sequentially: true,
            max_concurrent_renders: 0,
            completed_removal_delay: Duration::from_millis(20),
            poll_interval: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn test_sequential_mode_renders_one_at_a_time() {
        let dir = TempDir::new().unwrap();
        let queue = JobQueue::new(test_config());

        let first = MockRenderTask::new(JobKind::ProxyRender, "a.mp4", dir.path());
        let second = MockRenderTask::new(JobKind::ProxyRender, "b.mp4", dir.path());

        let first_id = queue.add_job(first.clone()).await.unwrap();
        let second_id = queue.add_job(second.clone()).await.unwrap();

        assert_eq!(queue.get_job(&first_id).unwrap().state, JobState::Rendering);
        assert_eq!(queue.get_job(&second_id).unwrap().state, JobState::Queued);
        assert!(first.was_started());
        assert!(!second.was_started());

        // Completing the first hands the slot to the second
        queue.apply_update(JobUpdate::completed(&first_id)).await;
        assert_eq!(queue.get_job(&first_id).unwrap().state, JobState::Completed);
        assert_eq!(
            queue.get_job(&second_id).unwrap().state,
            JobState::Rendering
        );
        assert!(second.was_started());

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_parallel_mode_starts_up_to_slot_count() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config();
        config.render_sequentially = false;
        config.max_concurrent_renders = 2;
        let queue = JobQueue::new(config);

        let tasks: Vec<_> = (0..3)
            .map(|i| MockRenderTask::new(JobKind::MotionRender, &format!("{i}.mp4"), dir.path()))
            .collect();
        for task in &tasks {
            queue.add_job(task.clone()).await.unwrap();
        }

        assert_eq!(queue.jobs_with_state(JobState::Rendering).len(), 2);
        assert_eq!(queue.jobs_with_state(JobState::Queued).len(), 1);

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_completion_forces_final_progress_and_text() {
        let dir = TempDir::new().unwrap();
        let queue = JobQueue::new(test_config());
        let task = MockRenderTask::new(JobKind::ProxyRender, "a.mp4", dir.path());
        let id = queue.add_job(task).await.unwrap();

        queue
            .apply_update(JobUpdate::rendering(&id, 0.5, 10.0, "a.mp4"))
            .await;
        queue.apply_update(JobUpdate::completed(&id)).await;

        let job = queue.get_job(&id).unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.progress, 1.0);
        assert_eq!(job.text, "Completed");
        assert!(job.completed_at.is_some());

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_progress_is_clamped() {
        let dir = TempDir::new().unwrap();
        let queue = JobQueue::new(test_config());
        let task = MockRenderTask::new(JobKind::ProxyRender, "a.mp4", dir.path());
        let id = queue.add_job(task).await.unwrap();

        // Producers can report slightly past the end
        queue
            .apply_update(JobUpdate::rendering(&id, 1.07, 10.0, "a.mp4"))
            .await;
        assert_eq!(queue.get_job(&id).unwrap().progress, 1.0);

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_update_after_cancel_is_ignored() {
        let dir = TempDir::new().unwrap();
        let queue = JobQueue::new(test_config());
        let task = MockRenderTask::new(JobKind::ProxyRender, "a.mp4", dir.path());
        let id = queue.add_job(task.clone()).await.unwrap();

        queue.cancel_job(&id).await.unwrap();
        assert!(task.was_aborted());

        let job = queue.get_job(&id).unwrap();
        assert_eq!(job.state, JobState::Cancelled);
        assert_eq!(job.progress_str(), "-");

        // A late helper report must not resurrect the job
        queue
            .apply_update(JobUpdate::rendering(&id, 0.8, 20.0, "a.mp4"))
            .await;
        assert_eq!(queue.get_job(&id).unwrap().state, JobState::Cancelled);

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_job_update_is_dropped() {
        let queue = JobQueue::new(test_config());
        // Must not panic or create a job
        queue
            .apply_update(JobUpdate::rendering("no-such-job", 0.5, 1.0, "x"))
            .await;
        assert_eq!(queue.active_count(), 0);
    }

    #[tokio::test]
    async fn test_delayed_removal_sweeps_finished_jobs() {
        let dir = TempDir::new().unwrap();
        let queue = JobQueue::new(test_config());
        let task = MockRenderTask::new(JobKind::ProxyRender, "a.mp4", dir.path());
        let id = queue.add_job(task).await.unwrap();

        queue.apply_update(JobUpdate::completed(&id)).await;
        // Still visible before the delay elapses
        assert_eq!(queue.active_count(), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(queue.active_count(), 0);

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_removal_sweep_starts_next_queued_job() {
        let dir = TempDir::new().unwrap();
        let queue = JobQueue::new(test_config());

        let first = MockRenderTask::new(JobKind::ProxyRender, "a.mp4", dir.path());
        let second = MockRenderTask::new(JobKind::ProxyRender, "b.mp4", dir.path());
        let first_id = queue.add_job(first).await.unwrap();
        let second_id = queue.add_job(second.clone()).await.unwrap();

        // Cancel the running job; the sweep hands the slot onwards
        queue.cancel_job(&first_id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(queue.get_job(&first_id).is_none());
        assert_eq!(
            queue.get_job(&second_id).unwrap().state,
            JobState::Rendering
        );
        assert!(second.was_started());

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancel_all_aborts_rendering_jobs() {
        let dir = TempDir::new().unwrap();
        let queue = JobQueue::new(test_config());

        let first = MockRenderTask::new(JobKind::ProxyRender, "a.mp4", dir.path());
        let second = MockRenderTask::new(JobKind::MotionRender, "b.mp4", dir.path());
        queue.add_job(first.clone()).await.unwrap();
        queue.add_job(second.clone()).await.unwrap();

        queue.cancel_all().await;

        assert!(first.was_aborted());
        // Queued job never started, nothing to abort
        assert!(!second.was_aborted());
        for job in queue.snapshot() {
            assert_eq!(job.state, JobState::Cancelled);
            assert_eq!(job.text, "Cancelled");
        }

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(queue.active_count(), 0);

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_start_hands_slot_to_next_job() {
        let dir = TempDir::new().unwrap();
        let queue = JobQueue::new(test_config());

        let bad = MockRenderTask::new(JobKind::ProxyRender, "bad.mp4", dir.path()).failing();
        let good = MockRenderTask::new(JobKind::ProxyRender, "good.mp4", dir.path());

        let bad_id = queue.add_job(bad).await.unwrap();
        assert_eq!(queue.get_job(&bad_id).unwrap().state, JobState::Failed);

        let good_id = queue.add_job(good.clone()).await.unwrap();
        assert_eq!(queue.get_job(&good_id).unwrap().state, JobState::Rendering);
        assert!(good.was_started());

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_snapshot_preserves_insertion_order() {
        let dir = TempDir::new().unwrap();
        let queue = JobQueue::new(test_config());

        let names = ["a.mp4", "b.mp4", "c.mp4"];
        for name in names {
            let task = MockRenderTask::new(JobKind::ProxyRender, name, dir.path());
            queue.add_job(task).await.unwrap();
        }

        let snapshot_names: Vec<String> =
            queue.snapshot().into_iter().map(|j| j.name).collect();
        assert_eq!(snapshot_names, names);

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_events_are_delivered_in_order() {
        let dir = TempDir::new().unwrap();
        let queue = JobQueue::new(test_config());
        let mut events = queue.take_event_receiver().unwrap();
        assert!(queue.take_event_receiver().is_none());

        let task = MockRenderTask::new(JobKind::ProxyRender, "a.mp4", dir.path());
        let id = queue.add_job(task).await.unwrap();
        queue.apply_update(JobUpdate::completed(&id)).await;

        assert!(matches!(events.recv().await, Some(JobEvent::Added { .. })));
        // Render start
        assert!(matches!(
            events.recv().await,
            Some(JobEvent::Updated { job }) if job.state == JobState::Rendering
        ));
        assert!(matches!(
            events.recv().await,
            Some(JobEvent::Completed { .. })
        ));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(matches!(
            events.recv().await,
            Some(JobEvent::Removed { job_id }) if job_id == id
        ));

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_wait_until_idle() {
        let dir = TempDir::new().unwrap();
        let queue = JobQueue::new(test_config());
        let task = MockRenderTask::new(JobKind::ProxyRender, "a.mp4", dir.path());
        let id = queue.add_job(task).await.unwrap();

        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.wait_until_idle().await })
        };

        queue.apply_update(JobUpdate::completed(&id)).await;

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("queue should drain")
            .unwrap();

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_completes_before_poller_registers_its_waiter() {
        let dir = TempDir::new().unwrap();
        let queue = JobQueue::new(test_config());
        let task = MockRenderTask::new(JobKind::ProxyRender, "a.mp4", dir.path());
        queue.add_job(task).await.unwrap();

        // No intervening await: on a current-thread runtime the lazily
        // spawned poller has not run yet, so the shutdown notification
        // finds no registered waiter.
        tokio::time::timeout(Duration::from_secs(3), queue.shutdown())
            .await
            .expect("shutdown should not hang");
    }

    #[test]
    fn test_render_slots() {
        let mut config = test_config();
        assert_eq!(config.render_slots(), 1);

        config.render_sequentially = false;
        config.max_concurrent_renders = 3;
        assert_eq!(config.render_slots(), 3);

        // 0 means one slot per CPU
        config.max_concurrent_renders = 0;
        assert_eq!(config.render_slots(), num_cpus::get());
    }

    #[tokio::test]
    async fn test_shutdown_refuses_new_jobs() {
        let dir = TempDir::new().unwrap();
        let queue = JobQueue::new(test_config());
        queue.shutdown().await;

        let task = MockRenderTask::new(JobKind::ProxyRender, "a.mp4", dir.path());
        assert!(matches!(
            queue.add_job(task).await,
            Err(CoreError::QueueShutDown)
        ));
    }

    #[tokio::test]
    async fn test_proxy_render_ongoing() {
        let dir = TempDir::new().unwrap();
        let queue = JobQueue::new(test_config());
        assert!(!queue.proxy_render_ongoing());

        let task = MockRenderTask::new(JobKind::ProxyRender, "a.mp4", dir.path());
        queue.add_job(task).await.unwrap();
        assert!(queue.proxy_render_ongoing());

        queue.shutdown().await;
    }
}
