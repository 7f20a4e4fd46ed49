//! Background Render Job System
//!
//! Tracks out-of-process render helpers as jobs in a queue: launching,
//! polling their session state, and reconciling QUEUED -> RENDERING ->
//! COMPLETED/FAILED/CANCELLED transitions. Consumers (a jobs panel, the
//! CLI) observe the queue through an event channel instead of touching
//! the list directly.

mod poller;
mod queue;

pub use queue::*;

#[cfg(test)]
pub(crate) mod testutil;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{session::SessionHandle, timecode, CoreResult, JobId, TimeSec};

// =============================================================================
// Job Types
// =============================================================================

/// Kind of background render a job tracks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobKind {
    /// Proxy encode of a media file
    ProxyRender,
    /// Motion (speed-changed) clip render
    MotionRender,
    /// Timeline selection rendered to a single clip
    SelectionRender,
    /// Scripted generator clip render
    GeneratorRender,
}

impl JobKind {
    /// Human-readable name shown in the jobs list
    pub fn display_name(&self) -> &'static str {
        match self {
            JobKind::ProxyRender => "Proxy Clip",
            JobKind::MotionRender => "Motion Clip",
            JobKind::SelectionRender => "Selection Clip",
            JobKind::GeneratorRender => "Generator Clip",
        }
    }
}

/// Job lifecycle state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobState {
    /// Waiting for a render slot
    #[default]
    Queued,
    /// Helper process is rendering
    Rendering,
    /// Finished successfully
    Completed,
    /// Helper failed or could not be launched
    Failed,
    /// Cancelled by the user
    Cancelled,
}

impl JobState {
    /// Terminal states leave the queue after the removal delay
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

/// One row in the job queue
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique job ID (ULID)
    pub id: JobId,
    /// Kind of render
    pub kind: JobKind,
    /// Current state
    pub state: JobState,
    /// Render progress 0.0 - 1.0; -1.0 after cancellation
    pub progress: f32,
    /// Display name (usually the output file name)
    pub name: String,
    /// Info text shown next to the job
    pub text: String,
    /// Wall-clock render time so far
    pub elapsed_sec: TimeSec,
    /// Creation timestamp
    pub created_at: String,
    /// Completion timestamp
    pub completed_at: Option<String>,
}

impl Job {
    /// Creates a queued job for a named render
    pub fn new(kind: JobKind, name: &str) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            kind,
            state: JobState::Queued,
            progress: 0.0,
            name: name.to_string(),
            text: format!("In Queue - {}", name),
            elapsed_sec: 0.0,
            created_at: chrono::Utc::now().to_rfc3339(),
            completed_at: None,
        }
    }

    pub fn is_rendering(&self) -> bool {
        self.state == JobState::Rendering
    }

    /// Progress column text; the -1.0 sentinel renders as "-"
    pub fn progress_str(&self) -> String {
        if self.progress < 0.0 {
            return "-".to_string();
        }
        format!("{}%", (self.progress * 100.0) as i32)
    }

    /// Render time column text
    pub fn elapsed_str(&self) -> String {
        timecode::duration_string(self.elapsed_sec)
    }
}

// =============================================================================
// Job Updates
// =============================================================================

/// State report applied to a job in the queue, produced by the status
/// poller or by the task launcher.
#[derive(Clone, Debug)]
pub struct JobUpdate {
    pub job_id: JobId,
    pub state: JobState,
    pub progress: f32,
    pub text: Option<String>,
    pub elapsed_sec: TimeSec,
}

impl JobUpdate {
    /// Progress report for a rendering job
    pub fn rendering(job_id: &str, progress: f32, elapsed_sec: TimeSec, text: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            state: JobState::Rendering,
            progress,
            text: Some(text.to_string()),
            elapsed_sec,
        }
    }

    /// Completion report
    pub fn completed(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            state: JobState::Completed,
            progress: 1.0,
            text: None,
            elapsed_sec: 0.0,
        }
    }

    /// Failure report
    pub fn failed(job_id: &str, error: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            state: JobState::Failed,
            progress: -1.0,
            text: Some(error.to_string()),
            elapsed_sec: 0.0,
        }
    }
}

// =============================================================================
// Job Events
// =============================================================================

/// Queue change notifications delivered over the event channel.
///
/// This replaces direct list-widget manipulation: whoever renders the
/// queue subscribes and redraws from `Job` snapshots.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JobEvent {
    Added {
        job: Job,
    },
    Updated {
        job: Job,
    },
    Completed {
        job: Job,
        output_path: Option<String>,
    },
    Failed {
        job: Job,
        error: String,
    },
    Cancelled {
        job: Job,
    },
    /// Job left the list after the removal delay
    Removed {
        job_id: JobId,
    },
}

// =============================================================================
// Render Task Interface
// =============================================================================

/// Interface a background render must implement to be queueable.
///
/// Implementations own the session handle their helper process reports
/// through; the queue starts them when a render slot opens and aborts
/// them on cancellation.
#[async_trait]
pub trait RenderTask: Send + Sync {
    /// Kind of job this task produces
    fn kind(&self) -> JobKind;

    /// Display name, usually the output file name
    fn name(&self) -> String;

    /// Session the helper process reports status through
    fn session(&self) -> &SessionHandle;

    /// Final output file, if the task produces one
    fn output_path(&self) -> Option<PathBuf>;

    /// Launches the helper process
    async fn start(&self) -> CoreResult<()>;

    /// Aborts the render
    async fn abort(&self) -> CoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_creation() {
        let job = Job::new(JobKind::ProxyRender, "clip.mp4");

        assert!(!job.id.is_empty());
        assert_eq!(job.kind, JobKind::ProxyRender);
        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.text, "In Queue - clip.mp4");
        assert!(!job.is_rendering());
    }

    #[test]
    fn test_job_state_terminality() {
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Rendering.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
    }

    #[test]
    fn test_progress_str() {
        let mut job = Job::new(JobKind::MotionRender, "out.mp4");
        job.progress = 0.37;
        assert_eq!(job.progress_str(), "37%");

        job.progress = -1.0;
        assert_eq!(job.progress_str(), "-");

        job.progress = 1.0;
        assert_eq!(job.progress_str(), "100%");
    }

    #[test]
    fn test_kind_display_names() {
        assert_eq!(JobKind::ProxyRender.display_name(), "Proxy Clip");
        assert_eq!(JobKind::GeneratorRender.display_name(), "Generator Clip");
    }
}
