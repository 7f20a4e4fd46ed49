//! Reelworks Core Engine
//!
//! Headless core of the Reelworks render queue.
//! Tracks out-of-process render helpers (proxy encodes, motion clips,
//! selection and generator renders), reconciles their on-disk session
//! state into a job list, and exposes the media/timecode helpers the
//! editor shares with those helpers.

pub mod fs;
pub mod jobs;
pub mod media;
pub mod process;
pub mod render;
pub mod session;
pub mod settings;
pub mod timecode;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;
