//! Render Session Protocol
//!
//! The queue and its out-of-process render helpers communicate through a
//! small directory per session: the helper writes progress into a status
//! file and drops a completion marker, the queue drops an abort marker
//! the helper polls for. Status writes are atomic so the 2 Hz polling
//! reader never observes a torn file.
//!
//! Layout: `<parent_dir>/<session_id>/{status,render_complete,abort}`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{fs, CoreResult, SessionId, TimeSec};

/// Status file name inside a session directory
pub const STATUS_FILE: &str = "status";

/// Marker dropped by the helper when the render has finished
pub const COMPLETE_MARKER: &str = "render_complete";

/// Marker dropped by the queue to request an abort
pub const ABORT_MARKER: &str = "abort";

// =============================================================================
// Session Status
// =============================================================================

/// Progress report written by a render helper.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Render progress fraction, 0.0 - 1.0. Helpers may report slightly
    /// past 1.0 when producers render longer than required.
    pub fraction: f64,
    /// Wall-clock render time so far, in fractional seconds
    pub elapsed_sec: TimeSec,
}

// =============================================================================
// Session Handle
// =============================================================================

/// Handle to one render session directory.
///
/// Both sides of the protocol use the same handle: helpers write status
/// and the completion marker, the queue reads them and writes the abort
/// marker.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    parent_dir: PathBuf,
    session_id: SessionId,
}

impl SessionHandle {
    /// Creates a handle after validating the session id is safe to use
    /// as a path component.
    pub fn new<P: AsRef<Path>>(parent_dir: P, session_id: &str) -> CoreResult<Self> {
        fs::validate_path_id_component(session_id, "sessionId")?;
        Ok(Self {
            parent_dir: parent_dir.as_ref().to_path_buf(),
            session_id: session_id.to_string(),
        })
    }

    /// Creates a handle with a fresh ULID session id.
    pub fn create<P: AsRef<Path>>(parent_dir: P) -> Self {
        Self {
            parent_dir: parent_dir.as_ref().to_path_buf(),
            session_id: ulid::Ulid::new().to_string(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn parent_dir(&self) -> &Path {
        &self.parent_dir
    }

    /// Full path of the session directory.
    pub fn session_dir(&self) -> PathBuf {
        self.parent_dir.join(&self.session_id)
    }

    /// Creates the session directory if it does not exist yet.
    pub fn ensure_session_dir(&self) -> CoreResult<()> {
        std::fs::create_dir_all(self.session_dir())?;
        Ok(())
    }

    // =========================================================================
    // Writer side (render helpers)
    // =========================================================================

    /// Writes a progress report. Used by helper processes.
    pub fn write_status(&self, fraction: f64, elapsed_sec: TimeSec) -> CoreResult<()> {
        self.ensure_session_dir()?;
        let status = SessionStatus {
            fraction,
            elapsed_sec,
        };
        fs::atomic_write_json(&self.session_dir().join(STATUS_FILE), &status)
    }

    /// Drops the completion marker. Used by helper processes.
    pub fn mark_complete(&self) -> CoreResult<()> {
        self.ensure_session_dir()?;
        std::fs::write(self.session_dir().join(COMPLETE_MARKER), b"")?;
        Ok(())
    }

    // =========================================================================
    // Reader side (queue / poller)
    // =========================================================================

    /// Reads the latest progress report.
    ///
    /// Returns `None` when the status file is missing or unparsable.
    /// Helpers start and stop on their own, so "no status yet" and
    /// "already gone" are normal conditions, never errors.
    pub fn read_status(&self) -> Option<SessionStatus> {
        let path = self.session_dir().join(STATUS_FILE);
        let contents = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(status) => Some(status),
            Err(e) => {
                debug!("Unparsable session status at {:?}: {}", path, e);
                None
            }
        }
    }

    /// Checks for the completion marker.
    pub fn is_complete(&self) -> bool {
        self.session_dir().join(COMPLETE_MARKER).exists()
    }

    /// Requests an abort by dropping the abort marker.
    pub fn request_abort(&self) -> CoreResult<()> {
        self.ensure_session_dir()?;
        std::fs::write(self.session_dir().join(ABORT_MARKER), b"")?;
        Ok(())
    }

    /// Checks for the abort marker. Used by helper processes.
    pub fn abort_requested(&self) -> bool {
        self.session_dir().join(ABORT_MARKER).exists()
    }

    /// Removes the whole session directory after completion or abort.
    pub fn remove_session_dir(&self) -> CoreResult<()> {
        let dir = self.session_dir();
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}

// =============================================================================
// Helper Argv Convention
// =============================================================================

/// Formats a `key:value` argument for a helper process command line.
pub fn format_arg(key: &str, value: &str) -> String {
    format!("{}:{}", key, value)
}

/// Looks up a `key:value` argument by key. Values may themselves contain
/// colons (paths on Windows), so only the first colon splits.
pub fn arg_value<'a, S: AsRef<str>>(args: &'a [S], key: &str) -> Option<&'a str> {
    args.iter().find_map(|arg| {
        let (k, v) = arg.as_ref().split_once(':')?;
        (k == key).then_some(v)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_session_id_validation() {
        let dir = TempDir::new().unwrap();
        assert!(SessionHandle::new(dir.path(), "01J8ZQK3").is_ok());
        assert!(SessionHandle::new(dir.path(), "../evil").is_err());
        assert!(SessionHandle::new(dir.path(), "").is_err());
    }

    #[test]
    fn test_status_round_trip() {
        let dir = TempDir::new().unwrap();
        let session = SessionHandle::create(dir.path());

        assert!(session.read_status().is_none());

        session.write_status(0.42, 12.5).unwrap();
        let status = session.read_status().unwrap();
        assert_eq!(status.fraction, 0.42);
        assert_eq!(status.elapsed_sec, 12.5);

        // Overwrites are observed
        session.write_status(0.9, 30.0).unwrap();
        assert_eq!(session.read_status().unwrap().fraction, 0.9);
    }

    #[test]
    fn test_torn_status_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let session = SessionHandle::create(dir.path());
        session.ensure_session_dir().unwrap();
        std::fs::write(session.session_dir().join(STATUS_FILE), b"{\"frac").unwrap();

        assert!(session.read_status().is_none());
    }

    #[test]
    fn test_complete_and_abort_markers() {
        let dir = TempDir::new().unwrap();
        let session = SessionHandle::create(dir.path());

        assert!(!session.is_complete());
        assert!(!session.abort_requested());

        session.mark_complete().unwrap();
        assert!(session.is_complete());

        session.request_abort().unwrap();
        assert!(session.abort_requested());
    }

    #[test]
    fn test_remove_session_dir() {
        let dir = TempDir::new().unwrap();
        let session = SessionHandle::create(dir.path());
        session.write_status(1.0, 5.0).unwrap();
        assert!(session.session_dir().exists());

        session.remove_session_dir().unwrap();
        assert!(!session.session_dir().exists());

        // Removing twice is fine
        session.remove_session_dir().unwrap();
    }

    #[test]
    fn test_helper_argv_convention() {
        let args = vec![
            format_arg("session_id", "01J8ZQ"),
            format_arg("parent_folder", "/tmp/reelworks"),
            "write_file:C:\\renders\\out.mp4".to_string(),
        ];

        assert_eq!(arg_value(&args, "session_id"), Some("01J8ZQ"));
        assert_eq!(arg_value(&args, "parent_folder"), Some("/tmp/reelworks"));
        // Only the first colon splits
        assert_eq!(arg_value(&args, "write_file"), Some("C:\\renders\\out.mp4"));
        assert_eq!(arg_value(&args, "missing"), None);
    }
}
