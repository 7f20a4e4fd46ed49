//! Test doubles for the job queue.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::{session::SessionHandle, CoreError, CoreResult};

use super::{JobKind, RenderTask};

/// In-process stand-in for a render helper launcher. Records starts and
/// aborts instead of spawning anything; its session directory behaves
/// exactly like a real helper's.
pub(crate) struct MockRenderTask {
    kind: JobKind,
    name: String,
    session: SessionHandle,
    started: AtomicBool,
    aborted: AtomicBool,
    fail_on_start: AtomicBool,
}

impl MockRenderTask {
    pub(crate) fn new(kind: JobKind, name: &str, parent_dir: &Path) -> Arc<Self> {
        Arc::new(Self {
            kind,
            name: name.to_string(),
            session: SessionHandle::create(parent_dir),
            started: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
            fail_on_start: AtomicBool::new(false),
        })
    }

    /// Makes `start()` fail, as a missing helper binary would
    pub(crate) fn failing(self: Arc<Self>) -> Arc<Self> {
        self.fail_on_start.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn was_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub(crate) fn was_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderTask for MockRenderTask {
    fn kind(&self) -> JobKind {
        self.kind
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn output_path(&self) -> Option<PathBuf> {
        Some(PathBuf::from(&self.name))
    }

    async fn start(&self) -> CoreResult<()> {
        if self.fail_on_start.load(Ordering::SeqCst) {
            return Err(CoreError::HelperNotFound(self.name.clone()));
        }
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn abort(&self) -> CoreResult<()> {
        self.aborted.store(true, Ordering::SeqCst);
        self.session.request_abort()?;
        Ok(())
    }
}
