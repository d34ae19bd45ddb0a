//! Player configuration.
//!
//! Plain JSON, every field defaulted:
//!
//! ```json
//! { "tracks": ["don.mp3", "len.mp3"], "autoplay_on_select": true }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PlayerError, PlayerResult};
use crate::models::Track;

/// Environment variable naming a config file for [`PlayerConfig::from_env`].
pub const CONFIG_ENV: &str = "LYRE_CONFIG";

const DEFAULT_TRACKS: &[&str] = &[
    "Recording 2024-10-16 225212.mp4",
    "don.mp3",
    "len.mp3",
    "remix.mp3",
    "see.mp3",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Track sources in playback order.
    pub tracks: Vec<String>,
    pub start_index: usize,
    pub start_looping: bool,
    /// Whether a playlist click starts the clicked track.
    pub autoplay_on_select: bool,
    /// Progress sampling period while playing.
    pub sample_interval_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            tracks: DEFAULT_TRACKS.iter().map(|s| s.to_string()).collect(),
            start_index: 0,
            start_looping: false,
            autoplay_on_select: false,
            sample_interval_ms: 250,
        }
    }
}

impl PlayerConfig {
    pub fn from_json_str(json: &str) -> PlayerResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> PlayerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Read the file named by `LYRE_CONFIG`, or defaults when it is unset.
    pub fn from_env() -> PlayerResult<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => {
                log::info!("lyre: loading config from {}", path);
                Self::load(path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> PlayerResult<()> {
        if self.tracks.is_empty() {
            return Err(PlayerError::EmptyPlaylist);
        }
        if self.sample_interval_ms == 0 {
            return Err(PlayerError::Config("sample_interval_ms must be positive".into()));
        }
        if self.start_index >= self.tracks.len() {
            return Err(PlayerError::Config(format!(
                "start_index {} is past the last track ({})",
                self.start_index,
                self.tracks.len() - 1
            )));
        }
        Ok(())
    }

    pub fn to_tracks(&self) -> Vec<Track> {
        self.tracks.iter().map(Track::from_source).collect()
    }

    pub fn sample_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.sample_interval_ms)
    }
}
