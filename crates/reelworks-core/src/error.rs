//! Reelworks Error Definitions
//!
//! Defines error types used throughout the project.

use thiserror::Error;

use super::JobId;

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Job Queue Errors
    // =========================================================================
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Job queue is shut down")]
    QueueShutDown,

    // =========================================================================
    // Render Session Errors
    // =========================================================================
    #[error("Invalid session identifier: {0}")]
    InvalidSessionId(String),

    #[error("Session directory missing: {0}")]
    SessionMissing(String),

    // =========================================================================
    // Render Helper Errors
    // =========================================================================
    #[error("Render helper not found: {0}")]
    HelperNotFound(String),

    #[error("Failed to launch render helper: {0}")]
    HelperLaunchFailed(String),

    // =========================================================================
    // Settings Errors
    // =========================================================================
    #[error("Settings error: {0}")]
    SettingsError(String),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;
