//! Events a host delivers to the controller.
//!
//! Tagged the same way on every host, so a browser page or a test can
//! forward `{"action": "seek", "fraction": 0.5}` without knowing Rust types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One UI or media event, consumed by `PlayerController::dispatch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlayerEvent {
    PlayPause,
    Next,
    Previous,
    ToggleLoop,
    TogglePlaylist,
    SelectTrack { index: usize },
    Seek { fraction: f64 },
    /// Host reports where the progress bar sits, in pointer coordinates.
    ResizeBar { left: f64, width: f64 },
    BeginSeekDrag { pointer_x: f64 },
    UpdateSeekDrag { pointer_x: f64 },
    EndSeekDrag,
    MetadataLoaded,
    TrackEnded,
    MediaFailed { message: String },
    /// Periodic progress sample.
    Tick,
    Render,
}

impl PlayerEvent {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn from_value(v: &Value) -> Option<Self> {
        serde_json::from_value(v.clone()).ok()
    }
}

/// Notifications a backend queues for the controller to pick up on its next tick.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    Ended,
    Failed(String),
}
