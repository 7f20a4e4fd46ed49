//! Cross-platform process spawning helpers.
//!
//! On Windows, spawning console binaries (render helpers, ffmpeg) from a
//! GUI application can cause a console window to appear for each
//! invocation. This module centralizes the Windows creation flags needed
//! to suppress that, and resolves helper binaries on PATH.

use std::path::{Path, PathBuf};

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Apply platform-specific flags to a tokio process command.
pub fn configure_tokio_command(cmd: &mut tokio::process::Command) {
    #[cfg(target_os = "windows")]
    {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}

/// Checks whether a program is installed, either as a direct path or by
/// scanning the `PATH` environment variable.
pub fn program_is_installed(program: &str) -> bool {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return is_executable(path);
    }

    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| is_executable(&dir.join(program)))
}

/// Resolves a helper binary: an explicit launch dir wins, otherwise the
/// bare name is left for PATH lookup at spawn time.
pub fn helper_program(helper_name: &str, launch_dir: Option<&Path>) -> PathBuf {
    match launch_dir {
        Some(dir) => dir.join(helper_name),
        None => PathBuf::from(helper_name),
    }
}

fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match path.metadata() {
            Ok(meta) => meta.permissions().mode() & 0o111 != 0,
            Err(_) => false,
        }
    }
    #[cfg(not(unix))]
    {
        true
    }
}
