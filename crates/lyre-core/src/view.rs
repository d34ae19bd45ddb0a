//! Rendering port.
//!
//! The controller never touches a DOM or a terminal directly. Hosts
//! implement [`PlayerView`] over whatever surface they draw on.

use crate::time::ProgressView;

/// Glyph shown on the play/pause button: what pressing it will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayIcon {
    Play,
    Pause,
}

impl PlayIcon {
    pub fn glyph(self) -> &'static str {
        match self {
            PlayIcon::Play => "\u{25B6}",
            PlayIcon::Pause => "\u{275A}\u{275A}",
        }
    }
}

/// One line of the playlist panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistRow {
    pub index: usize,
    pub title: String,
    pub active: bool,
}

pub trait PlayerView {
    fn set_play_icon(&mut self, icon: PlayIcon);
    fn set_loop_indicator(&mut self, active: bool);
    fn set_track_name(&mut self, name: &str);
    /// Replace the whole list. Exactly one row is active.
    fn render_playlist(&mut self, rows: &[PlaylistRow]);
    fn render_progress(&mut self, progress: &ProgressView);
    fn set_playlist_visible(&mut self, visible: bool);
    fn show_error(&mut self, message: &str);
    fn clear_error(&mut self) {}
}

/// Draws nothing. For headless hosts and tests that only inspect state.
#[derive(Debug, Default)]
pub struct NullView;

impl PlayerView for NullView {
    fn set_play_icon(&mut self, _: PlayIcon) {}
    fn set_loop_indicator(&mut self, _: bool) {}
    fn set_track_name(&mut self, _: &str) {}
    fn render_playlist(&mut self, _: &[PlaylistRow]) {}
    fn render_progress(&mut self, _: &ProgressView) {}
    fn set_playlist_visible(&mut self, _: bool) {}
    fn show_error(&mut self, _: &str) {}
}
