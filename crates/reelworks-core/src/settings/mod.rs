//! Settings Persistence System
//!
//! Persistent queue settings with:
//! - Atomic file writes (temp file + rename)
//! - Schema validation with defaults
//! - Migration support for schema changes
//!
//! Storage location: {data_dir}/reelworks/settings.json

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::jobs::QueueConfig;
use crate::{fs, CoreError, CoreResult};

/// Settings schema version for migration support
pub const SETTINGS_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// Lock file name (advisory lock to prevent concurrent writers)
pub const SETTINGS_LOCK_FILE: &str = "settings.json.lock";

// =============================================================================
// Queue Settings
// =============================================================================

/// Render queue settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueSettings {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Render jobs one at a time instead of in parallel
    #[serde(default = "default_true")]
    pub render_sequentially: bool,

    /// Parallel-mode render slot bound; 0 means one per CPU
    #[serde(default)]
    pub max_concurrent_renders: usize,

    /// How long finished jobs stay in the list before removal
    #[serde(default = "default_removal_delay_ms")]
    pub completed_removal_delay_ms: u64,

    /// Session status polling interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Directory containing the render helper binaries; None means
    /// PATH lookup
    #[serde(default)]
    pub helper_launch_dir: Option<String>,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

fn default_true() -> bool {
    true
}

fn default_removal_delay_ms() -> u64 {
    4000
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            render_sequentially: true,
            max_concurrent_renders: 0,
            completed_removal_delay_ms: default_removal_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            helper_launch_dir: None,
        }
    }
}

impl QueueSettings {
    /// Normalizes and clamps settings so persisted state is always valid.
    ///
    /// Tolerant by intent: bad values are corrected instead of failing,
    /// so corrupted or old configs don't brick the queue.
    pub fn normalize(&mut self) {
        self.version = SETTINGS_VERSION;

        // 0 means "auto".
        if self.max_concurrent_renders != 0 {
            self.max_concurrent_renders = self.max_concurrent_renders.clamp(1, 32);
        }
        self.completed_removal_delay_ms = self.completed_removal_delay_ms.min(60_000);
        self.poll_interval_ms = self.poll_interval_ms.clamp(100, 5_000);

        if let Some(dir) = &self.helper_launch_dir {
            if dir.trim().is_empty() {
                self.helper_launch_dir = None;
            }
        }
    }

    /// Resolved helper launch directory
    pub fn helper_launch_dir(&self) -> Option<PathBuf> {
        self.helper_launch_dir.as_ref().map(PathBuf::from)
    }
}

impl From<&QueueSettings> for QueueConfig {
    fn from(settings: &QueueSettings) -> Self {
        Self {
            render_sequentially: settings.render_sequentially,
            max_concurrent_renders: settings.max_concurrent_renders,
            completed_removal_delay: Duration::from_millis(settings.completed_removal_delay_ms),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
        }
    }
}

/// Default application data directory for settings and temp render
/// session folders.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("reelworks")
}

// =============================================================================
// Settings Manager
// =============================================================================

/// Settings manager for loading, saving, and resetting settings
pub struct SettingsManager {
    settings_path: PathBuf,
}

impl SettingsManager {
    /// Create a new settings manager with the given data directory
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            settings_path: data_dir.join(SETTINGS_FILE),
        }
    }

    /// Get the settings file path
    pub fn settings_path(&self) -> &PathBuf {
        &self.settings_path
    }

    fn lock_path(&self) -> PathBuf {
        self.settings_path
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .join(SETTINGS_LOCK_FILE)
    }

    fn with_lock<T>(
        &self,
        exclusive: bool,
        op: impl FnOnce() -> CoreResult<T>,
    ) -> CoreResult<T> {
        // Ensure parent directory exists so the lock file can be created.
        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;

        if exclusive {
            fs2::FileExt::lock_exclusive(&lock_file)
                .map_err(|e| CoreError::SettingsError(format!("exclusive lock failed: {e}")))?;
        } else {
            fs2::FileExt::lock_shared(&lock_file)
                .map_err(|e| CoreError::SettingsError(format!("shared lock failed: {e}")))?;
        }

        let result = op();

        if let Err(e) = fs2::FileExt::unlock(&lock_file) {
            warn!("Failed to unlock settings lock file: {}", e);
        }

        result
    }

    /// Load settings from disk, returning defaults if the file is
    /// missing or unreadable
    pub fn load(&self) -> QueueSettings {
        let result = self.with_lock(false, || {
            if !self.settings_path.exists() {
                info!("Settings file not found, using defaults");
                return Ok(QueueSettings::default());
            }

            let content = std::fs::read_to_string(&self.settings_path)?;
            let mut settings: QueueSettings = serde_json::from_str(&content)?;

            if settings.version < SETTINGS_VERSION {
                info!(
                    "Migrating settings from version {} to {}",
                    settings.version, SETTINGS_VERSION
                );
                settings = self.migrate(settings);
            }

            settings.normalize();
            Ok(settings)
        });

        match result {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                QueueSettings::default()
            }
        }
    }

    /// Save settings to disk using an atomic write
    pub fn save(&self, settings: &QueueSettings) -> CoreResult<QueueSettings> {
        self.with_lock(true, || {
            // Normalize before persisting.
            let mut normalized = settings.clone();
            normalized.normalize();

            fs::atomic_write_json(&self.settings_path, &normalized)?;

            info!("Settings saved to {:?}", self.settings_path);
            Ok(normalized)
        })
    }

    /// Reset settings to defaults and delete the settings file
    pub fn reset(&self) -> CoreResult<QueueSettings> {
        self.with_lock(true, || {
            if self.settings_path.exists() {
                std::fs::remove_file(&self.settings_path)?;
                info!("Settings file deleted");
            }
            Ok(QueueSettings::default())
        })
    }

    /// Migrate settings from older version
    fn migrate(&self, mut settings: QueueSettings) -> QueueSettings {
        // Future migrations go here.
        settings.version = SETTINGS_VERSION;
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = QueueSettings::default();
        assert!(settings.render_sequentially);
        assert_eq!(settings.max_concurrent_renders, 0);
        assert_eq!(settings.completed_removal_delay_ms, 4000);
        assert_eq!(settings.poll_interval_ms, 500);
        assert!(settings.helper_launch_dir.is_none());
    }

    #[test]
    fn test_normalize_clamps_values() {
        let mut settings = QueueSettings {
            max_concurrent_renders: 500,
            completed_removal_delay_ms: 1_000_000,
            poll_interval_ms: 1,
            helper_launch_dir: Some("   ".to_string()),
            ..QueueSettings::default()
        };
        settings.normalize();

        assert_eq!(settings.max_concurrent_renders, 32);
        assert_eq!(settings.completed_removal_delay_ms, 60_000);
        assert_eq!(settings.poll_interval_ms, 100);
        assert!(settings.helper_launch_dir.is_none());
    }

    #[test]
    fn test_normalize_keeps_auto_concurrency() {
        let mut settings = QueueSettings::default();
        settings.max_concurrent_renders = 0;
        settings.normalize();
        assert_eq!(settings.max_concurrent_renders, 0);
    }

    #[test]
    fn test_queue_config_from_settings() {
        let settings = QueueSettings {
            render_sequentially: false,
            max_concurrent_renders: 3,
            completed_removal_delay_ms: 2000,
            poll_interval_ms: 250,
            ..QueueSettings::default()
        };
        let config = QueueConfig::from(&settings);

        assert!(!config.render_sequentially);
        assert_eq!(config.render_slots(), 3);
        assert_eq!(config.completed_removal_delay, Duration::from_millis(2000));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(dir.path().to_path_buf());

        let mut settings = QueueSettings::default();
        settings.render_sequentially = false;
        settings.max_concurrent_renders = 4;

        manager.save(&settings).unwrap();
        let loaded = manager.load();

        assert!(!loaded.render_sequentially);
        assert_eq!(loaded.max_concurrent_renders, 4);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(dir.path().to_path_buf());
        assert_eq!(manager.load(), QueueSettings::default());
    }

    #[test]
    fn test_load_corrupt_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(dir.path().to_path_buf());
        std::fs::write(manager.settings_path(), b"{not json").unwrap();
        assert_eq!(manager.load(), QueueSettings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(dir.path().to_path_buf());
        std::fs::write(
            manager.settings_path(),
            b"{\"renderSequentially\": false}",
        )
        .unwrap();

        let loaded = manager.load();
        assert!(!loaded.render_sequentially);
        assert_eq!(loaded.poll_interval_ms, 500);
    }

    #[test]
    fn test_reset_deletes_file() {
        let dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(dir.path().to_path_buf());
        manager.save(&QueueSettings::default()).unwrap();
        assert!(manager.settings_path().exists());

        let settings = manager.reset().unwrap();
        assert_eq!(settings, QueueSettings::default());
        assert!(!manager.settings_path().exists());
    }
}
