//! The player's single mutable record.

use serde::Serialize;
use serde_json::Value;

use super::track::Track;

/// Playback status. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    #[default]
    Paused,
    Playing,
}

/// Authoritative player state, owned by one controller.
///
/// `current_index < songs.len()` holds for the whole lifetime; the
/// controller refuses to be built over an empty playlist.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerState {
    pub is_playing: bool,
    pub is_looping: bool,
    pub current_index: usize,
    pub songs: Vec<Track>,
    /// Last media failure shown to the user. Cleared by a successful play.
    pub last_error: Option<String>,
}

impl PlayerState {
    pub(crate) fn new(songs: Vec<Track>, current_index: usize, is_looping: bool) -> Self {
        Self {
            is_playing: false,
            is_looping,
            current_index,
            songs,
            last_error: None,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        if self.is_playing {
            PlaybackStatus::Playing
        } else {
            PlaybackStatus::Paused
        }
    }

    pub fn current_track(&self) -> &Track {
        &self.songs[self.current_index]
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Index one step forward or back, wrapping at both ends.
    pub fn neighbour(&self, forward: bool) -> usize {
        let len = self.songs.len();
        if forward {
            (self.current_index + 1) % len
        } else {
            (self.current_index + len - 1) % len
        }
    }

    pub fn to_value(&self) -> Value {
        let mut v = serde_json::to_value(self).unwrap_or(Value::Null);
        v["status"] = serde_json::to_value(self.status()).unwrap_or(Value::Null);
        v
    }
}
