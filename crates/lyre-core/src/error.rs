//! Error types.
//!
//! Only construction and configuration errors propagate. Everything the
//! controller does at runtime is best-effort and degrades to a logged,
//! user-visible state instead of returning an error.

use thiserror::Error;

/// Failures reported by a [`MediaBackend`](crate::effects::MediaBackend).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MediaError {
    /// The source cannot be opened, probed or decoded.
    #[error("media unavailable: {track}: {reason}")]
    Unavailable { track: String, reason: String },
    /// `play` was called before any source was loaded.
    #[error("no track loaded")]
    NothingLoaded,
    /// The output device could not be opened or failed mid-stream.
    #[error("audio device: {0}")]
    Device(String),
}

impl MediaError {
    pub fn unavailable(track: &str, reason: impl ToString) -> Self {
        MediaError::Unavailable {
            track: track.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors surfaced by the player controller and its configuration.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("playlist is empty")]
    EmptyPlaylist,

    #[error("track index {index} out of range (playlist has {len})")]
    TrackOutOfRange { index: usize, len: usize },

    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("config io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type PlayerResult<T> = Result<T, PlayerError>;

/// Log errors from best-effort operations without propagating them.
pub(crate) fn log_err<T, E: std::fmt::Display>(result: Result<T, E>, context: &str) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            log::warn!("lyre: {} failed: {}", context, e);
            false
        }
    }
}
