//! Render Helper Launchers
//!
//! Concrete `RenderTask` implementations. Each launches the matching
//! out-of-process helper binary with the `key:value` argv convention and
//! reports through a session directory. Output files go where the
//! caller decided; the session parent dir is used for message passing
//! only.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tracing::info;

use crate::{
    jobs::{JobKind, RenderTask},
    process,
    session::{self, SessionHandle},
    CoreError, CoreResult,
};

/// Helper binary names, resolved on PATH or in the configured launch dir
pub const PROXY_HELPER: &str = "reelworks-proxy-helper";
pub const MOTION_HELPER: &str = "reelworks-motion-helper";
pub const SELECTION_HELPER: &str = "reelworks-selection-helper";
pub const GENERATOR_HELPER: &str = "reelworks-generator-helper";

// =============================================================================
// Helper Launching
// =============================================================================

/// Spawns a detached helper process.
///
/// Helpers run on their own: no handle is kept, and all further
/// communication happens through the session directory.
async fn launch_helper(
    helper_name: &str,
    launch_dir: Option<&Path>,
    args: &[String],
    session: &SessionHandle,
) -> CoreResult<()> {
    session.ensure_session_dir()?;

    let program = process::helper_program(helper_name, launch_dir);
    let mut cmd = tokio::process::Command::new(&program);
    cmd.args(args)
        .arg(session::format_arg("session_id", session.session_id()))
        .arg(session::format_arg(
            "parent_folder",
            &session.parent_dir().to_string_lossy(),
        ))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    process::configure_tokio_command(&mut cmd);

    cmd.spawn().map_err(|e| {
        CoreError::HelperLaunchFailed(format!("{}: {}", program.display(), e))
    })?;

    info!(
        "Launched {} for session {}",
        helper_name,
        session.session_id()
    );
    Ok(())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

// =============================================================================
// Proxy Render
// =============================================================================

/// Proxy encode of a media file, performed by the proxy helper.
pub struct ProxyRenderTask {
    session: SessionHandle,
    source_path: PathBuf,
    proxy_path: PathBuf,
    encoding_index: u32,
    launch_dir: Option<PathBuf>,
}

impl ProxyRenderTask {
    pub fn new<P: AsRef<Path>>(
        parent_dir: P,
        source_path: PathBuf,
        proxy_path: PathBuf,
        encoding_index: u32,
    ) -> Self {
        Self {
            session: SessionHandle::create(parent_dir),
            source_path,
            proxy_path,
            encoding_index,
            launch_dir: None,
        }
    }

    /// Overrides the helper launch directory (defaults to PATH lookup)
    pub fn with_launch_dir(mut self, dir: PathBuf) -> Self {
        self.launch_dir = Some(dir);
        self
    }

    fn argv(&self) -> Vec<String> {
        vec![
            session::format_arg("source_path", &self.source_path.to_string_lossy()),
            session::format_arg("proxy_path", &self.proxy_path.to_string_lossy()),
            session::format_arg("enc_index", &self.encoding_index.to_string()),
        ]
    }
}

#[async_trait]
impl RenderTask for ProxyRenderTask {
    fn kind(&self) -> JobKind {
        JobKind::ProxyRender
    }

    fn name(&self) -> String {
        file_name_of(&self.source_path)
    }

    fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn output_path(&self) -> Option<PathBuf> {
        Some(self.proxy_path.clone())
    }

    async fn start(&self) -> CoreResult<()> {
        launch_helper(
            PROXY_HELPER,
            self.launch_dir.as_deref(),
            &self.argv(),
            &self.session,
        )
        .await
    }

    async fn abort(&self) -> CoreResult<()> {
        self.session.request_abort()
    }
}

// =============================================================================
// Motion Render
// =============================================================================

/// Motion (speed-changed) clip render to a user-chosen write file.
pub struct MotionRenderTask {
    session: SessionHandle,
    write_file: PathBuf,
    args: Vec<String>,
    launch_dir: Option<PathBuf>,
}

impl MotionRenderTask {
    pub fn new<P: AsRef<Path>>(parent_dir: P, write_file: PathBuf, args: Vec<String>) -> Self {
        Self {
            session: SessionHandle::create(parent_dir),
            write_file,
            args,
            launch_dir: None,
        }
    }

    pub fn with_launch_dir(mut self, dir: PathBuf) -> Self {
        self.launch_dir = Some(dir);
        self
    }

    fn argv(&self) -> Vec<String> {
        let mut argv = vec![session::format_arg(
            "write_file",
            &self.write_file.to_string_lossy(),
        )];
        argv.extend(self.args.iter().cloned());
        argv
    }
}

#[async_trait]
impl RenderTask for MotionRenderTask {
    fn kind(&self) -> JobKind {
        JobKind::MotionRender
    }

    fn name(&self) -> String {
        file_name_of(&self.write_file)
    }

    fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn output_path(&self) -> Option<PathBuf> {
        Some(self.write_file.clone())
    }

    async fn start(&self) -> CoreResult<()> {
        launch_helper(
            MOTION_HELPER,
            self.launch_dir.as_deref(),
            &self.argv(),
            &self.session,
        )
        .await
    }

    async fn abort(&self) -> CoreResult<()> {
        self.session.request_abort()
    }
}

// =============================================================================
// Selection Render
// =============================================================================

/// Timeline selection rendered to a single clip from an MLT XML
/// composition file.
pub struct SelectionRenderTask {
    session: SessionHandle,
    xml_path: PathBuf,
    write_file: PathBuf,
    launch_dir: Option<PathBuf>,
}

impl SelectionRenderTask {
    pub fn new<P: AsRef<Path>>(parent_dir: P, xml_path: PathBuf, write_file: PathBuf) -> Self {
        Self {
            session: SessionHandle::create(parent_dir),
            xml_path,
            write_file,
            launch_dir: None,
        }
    }

    pub fn with_launch_dir(mut self, dir: PathBuf) -> Self {
        self.launch_dir = Some(dir);
        self
    }

    fn argv(&self) -> Vec<String> {
        vec![
            session::format_arg("xml_path", &self.xml_path.to_string_lossy()),
            session::format_arg("write_file", &self.write_file.to_string_lossy()),
        ]
    }
}

#[async_trait]
impl RenderTask for SelectionRenderTask {
    fn kind(&self) -> JobKind {
        JobKind::SelectionRender
    }

    fn name(&self) -> String {
        file_name_of(&self.write_file)
    }

    fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn output_path(&self) -> Option<PathBuf> {
        Some(self.write_file.clone())
    }

    async fn start(&self) -> CoreResult<()> {
        launch_helper(
            SELECTION_HELPER,
            self.launch_dir.as_deref(),
            &self.argv(),
            &self.session,
        )
        .await
    }

    async fn abort(&self) -> CoreResult<()> {
        self.session.request_abort()
    }
}

// =============================================================================
// Generator Render
// =============================================================================

/// Scripted generator clip render.
pub struct GeneratorRenderTask {
    session: SessionHandle,
    script_path: PathBuf,
    write_file: PathBuf,
    args: Vec<String>,
    launch_dir: Option<PathBuf>,
}

impl GeneratorRenderTask {
    pub fn new<P: AsRef<Path>>(
        parent_dir: P,
        script_path: PathBuf,
        write_file: PathBuf,
        args: Vec<String>,
    ) -> Self {
        Self {
            session: SessionHandle::create(parent_dir),
            script_path,
            write_file,
            args,
            launch_dir: None,
        }
    }

    pub fn with_launch_dir(mut self, dir: PathBuf) -> Self {
        self.launch_dir = Some(dir);
        self
    }

    fn argv(&self) -> Vec<String> {
        let mut argv = vec![
            session::format_arg("script_path", &self.script_path.to_string_lossy()),
            session::format_arg("write_file", &self.write_file.to_string_lossy()),
        ];
        argv.extend(self.args.iter().cloned());
        argv
    }
}

#[async_trait]
impl RenderTask for GeneratorRenderTask {
    fn kind(&self) -> JobKind {
        JobKind::GeneratorRender
    }

    fn name(&self) -> String {
        file_name_of(&self.write_file)
    }

    fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn output_path(&self) -> Option<PathBuf> {
        Some(self.write_file.clone())
    }

    async fn start(&self) -> CoreResult<()> {
        launch_helper(
            GENERATOR_HELPER,
            self.launch_dir.as_deref(),
            &self.argv(),
            &self.session,
        )
        .await
    }

    async fn abort(&self) -> CoreResult<()> {
        self.session.request_abort()
    }
}
