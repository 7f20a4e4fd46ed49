//! Filesystem utilities.
//!
//! Safe primitives for writing small state files in a crash-tolerant way.
//! Session status files and settings are read by concurrent processes, so
//! a partial write must never be observable.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::{CoreError, CoreResult};

// =============================================================================
// Path Validation Utilities
// =============================================================================

/// Validates that an identifier component is safe to use in file paths.
///
/// Rejects empty strings, path traversal sequences (`..`), path
/// separators, drive letter indicators and control characters. Every
/// identifier that becomes part of a session path goes through this.
pub fn validate_path_id_component(id: &str, label: &str) -> CoreResult<()> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CoreError::ValidationError(format!(
            "{label} is empty or contains only whitespace"
        )));
    }
    if trimmed.contains("..")
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains(':')
    {
        return Err(CoreError::ValidationError(format!(
            "Invalid {label}: contains path traversal characters"
        )));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(CoreError::ValidationError(format!(
            "Invalid {label}: contains control characters"
        )));
    }
    Ok(())
}

// =============================================================================
// Atomic Writes
// =============================================================================

/// Writes bytes to `path` atomically: write to a sibling temp file, sync,
/// then rename over the target.
///
/// Note: `std::fs::rename` does not overwrite on Windows, so the target
/// is moved aside first there.
pub fn atomic_write(path: &Path, contents: &[u8]) -> CoreResult<()> {
    let temp_path = path.with_extension("tmp");
    if temp_path.exists() {
        let _ = std::fs::remove_file(&temp_path);
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(contents)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    if cfg!(windows) {
        let backup_path = path.with_extension("bak");
        if backup_path.exists() {
            let _ = std::fs::remove_file(&backup_path);
        }
        if path.exists() {
            std::fs::rename(path, &backup_path)?;
        }
        match std::fs::rename(&temp_path, path) {
            Ok(()) => {
                if backup_path.exists() {
                    let _ = std::fs::remove_file(&backup_path);
                }
            }
            Err(e) => {
                // Best-effort restore.
                if backup_path.exists() {
                    let _ = std::fs::rename(&backup_path, path);
                }
                return Err(e.into());
            }
        }
    } else {
        std::fs::rename(&temp_path, path)?;
    }

    Ok(())
}

/// Serializes a value as pretty JSON and writes it atomically.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    let contents = serde_json::to_vec_pretty(value)?;
    atomic_write(path, &contents)
}
