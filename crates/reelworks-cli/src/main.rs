//! Reelworks command line interface.
//!
//! Submits background renders to the job queue and streams their
//! progress, plus small inspection commands for media files, timecodes
//! and persisted settings.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use reelworks_core::jobs::{JobEvent, JobQueue, QueueConfig};
use reelworks_core::render::{
    GeneratorRenderTask, MotionRenderTask, ProxyRenderTask, SelectionRenderTask,
};
use reelworks_core::session::SessionHandle;
use reelworks_core::settings::{default_data_dir, QueueSettings, SettingsManager};
use reelworks_core::{media, timecode};

#[derive(Parser)]
#[command(name = "reelworks")]
#[command(about = "Background render queue for media files", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Data directory override (settings and render sessions)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a proxy clip for a media file
    Proxy {
        /// Source media file
        source: PathBuf,
        /// Proxy file to write
        #[arg(short, long)]
        output: PathBuf,
        /// Proxy encoding preset index
        #[arg(long, default_value_t = 0)]
        enc_index: u32,
    },
    /// Render a motion (speed-changed) clip
    Motion {
        /// Clip file to write
        #[arg(short, long)]
        output: PathBuf,
        /// Extra key:value arguments passed to the motion helper
        args: Vec<String>,
    },
    /// Render a timeline selection from an MLT XML composition
    Selection {
        /// Composition XML file
        xml: PathBuf,
        /// Clip file to write
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Render a scripted generator clip
    Generator {
        /// Generator script file
        script: PathBuf,
        /// Clip file to write
        #[arg(short, long)]
        output: PathBuf,
        /// Extra key:value arguments passed to the generator helper
        args: Vec<String>,
    },
    /// Identify the media type of a file
    Ident {
        /// File to identify
        path: PathBuf,
    },
    /// Convert between timecodes and frame positions
    Tc {
        /// Timecode (hh:mm:ss:ff) or a plain frame number
        value: String,
        /// Frames per second, decimal or rational (e.g. 30000/1001)
        #[arg(long, default_value = "25")]
        fps: String,
    },
    /// Show the status of a render session directory
    Status {
        /// Session parent directory
        parent_dir: PathBuf,
        /// Session id
        session_id: String,
    },
    /// Show or reset persisted queue settings
    Settings {
        /// Reset settings to defaults
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    let settings = SettingsManager::new(data_dir.clone()).load();
    debug!("Using data dir {:?}", data_dir);

    match cli.command {
        Command::Proxy {
            source,
            output,
            enc_index,
        } => {
            if !source.exists() {
                bail!("source file does not exist: {}", source.display());
            }
            let mut task = ProxyRenderTask::new(sessions_dir(&data_dir)?, source, output, enc_index);
            if let Some(dir) = settings.helper_launch_dir() {
                task = task.with_launch_dir(dir);
            }
            run_job(std::sync::Arc::new(task), &settings).await
        }
        Command::Motion { output, args } => {
            let mut task = MotionRenderTask::new(sessions_dir(&data_dir)?, output, args);
            if let Some(dir) = settings.helper_launch_dir() {
                task = task.with_launch_dir(dir);
            }
            run_job(std::sync::Arc::new(task), &settings).await
        }
        Command::Selection { xml, output } => {
            if !media::is_mlt_xml_file(&xml) {
                bail!("not an MLT XML composition file: {}", xml.display());
            }
            let mut task = SelectionRenderTask::new(sessions_dir(&data_dir)?, xml, output);
            if let Some(dir) = settings.helper_launch_dir() {
                task = task.with_launch_dir(dir);
            }
            run_job(std::sync::Arc::new(task), &settings).await
        }
        Command::Generator {
            script,
            output,
            args,
        } => {
            let mut task = GeneratorRenderTask::new(sessions_dir(&data_dir)?, script, output, args);
            if let Some(dir) = settings.helper_launch_dir() {
                task = task.with_launch_dir(dir);
            }
            run_job(std::sync::Arc::new(task), &settings).await
        }
        Command::Ident { path } => {
            let media_type = media::media_type_for_path(&path);
            println!("{}", serde_json::to_string(&media_type)?);
            Ok(())
        }
        Command::Tc { value, fps } => {
            let fps = timecode::parse_fps(&fps)
                .with_context(|| format!("invalid frame rate: {fps}"))?;
            if value.contains(':') {
                println!("{}", timecode::tc_frame(&value, fps));
            } else {
                let frame: i64 = value
                    .parse()
                    .with_context(|| format!("not a frame number or timecode: {value}"))?;
                println!("{}", timecode::tc_string(frame, fps));
            }
            Ok(())
        }
        Command::Status {
            parent_dir,
            session_id,
        } => {
            let session = SessionHandle::new(&parent_dir, &session_id)?;
            if session.is_complete() {
                println!("complete");
            } else if let Some(status) = session.read_status() {
                println!(
                    "rendering {:.0}% ({})",
                    status.fraction * 100.0,
                    timecode::duration_string(status.elapsed_sec)
                );
            } else {
                println!("no status");
            }
            Ok(())
        }
        Command::Settings { reset } => {
            let manager = SettingsManager::new(data_dir);
            let settings: QueueSettings = if reset { manager.reset()? } else { manager.load() };
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

/// Directory render session folders are created under.
fn sessions_dir(data_dir: &std::path::Path) -> Result<PathBuf> {
    let dir = data_dir.join("sessions");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    Ok(dir)
}

/// Submits one task, streams its progress and waits for the queue to
/// drain.
async fn run_job(
    task: std::sync::Arc<dyn reelworks_core::jobs::RenderTask>,
    settings: &QueueSettings,
) -> Result<()> {
    let queue = JobQueue::new(QueueConfig::from(settings));
    let mut events = queue
        .take_event_receiver()
        .context("event receiver already taken")?;

    let job_id = queue.add_job(task).await?;
    println!("submitted job {job_id}");

    let mut failed = false;
    while let Some(event) = events.recv().await {
        match event {
            JobEvent::Added { .. } => {}
            JobEvent::Updated { job } => {
                println!("{} {} {}", job.progress_str(), job.elapsed_str(), job.text);
            }
            JobEvent::Completed { job, output_path } => {
                match output_path {
                    Some(path) => println!("completed {} -> {}", job.name, path),
                    None => println!("completed {}", job.name),
                }
            }
            JobEvent::Failed { job, error } => {
                eprintln!("failed {}: {}", job.name, error);
                failed = true;
            }
            JobEvent::Cancelled { job } => {
                println!("cancelled {}", job.name);
            }
            JobEvent::Removed { .. } => break,
        }
    }

    queue.wait_until_idle().await;
    queue.shutdown().await;

    if failed {
        bail!("render failed");
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}
