//! Player controller: the single authority over playback state and its
//! reflection in the view.
//!
//! Every operation runs to completion on the caller's thread. Side effects
//! against the media backend are best-effort; failures are logged, stored
//! in `PlayerState::last_error` and shown through the view, and the state
//! falls back to `Paused` so it never claims to play while the backend is
//! silent.

use std::time::Duration;

use serde_json::Value;

use crate::config::PlayerConfig;
use crate::drag::{clamp_fraction, BarGeometry, SeekDrag};
use crate::effects::{MediaBackend, Scheduler, Subscription};
use crate::error::{log_err, MediaError, PlayerError, PlayerResult};
use crate::models::{MediaEvent, PlayerEvent, PlayerState, Track};
use crate::time::ProgressView;
use crate::view::{PlayIcon, PlayerView, PlaylistRow};

/// Options the controller is built with, beyond the playlist itself.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub start_index: usize,
    pub start_looping: bool,
    pub autoplay_on_select: bool,
    pub sample_interval: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from(&PlayerConfig::default())
    }
}

impl From<&PlayerConfig> for ControllerOptions {
    fn from(config: &PlayerConfig) -> Self {
        Self {
            start_index: config.start_index,
            start_looping: config.start_looping,
            autoplay_on_select: config.autoplay_on_select,
            sample_interval: config.sample_interval(),
        }
    }
}

pub struct PlayerController<B, V, S> {
    backend: B,
    view: V,
    scheduler: S,
    state: PlayerState,
    drag: SeekDrag,
    bar: BarGeometry,
    /// Live progress sampling. `Some` exactly while playing.
    sampling: Option<Subscription>,
    sample_interval: Duration,
    autoplay_on_select: bool,
    playlist_visible: bool,
}

impl<B: MediaBackend, V: PlayerView, S: Scheduler> PlayerController<B, V, S> {
    /// Build a controller over `tracks` and bring the view to its initial state.
    ///
    /// The start track is loaded right away; if the backend rejects it the
    /// error is shown and the controller is still returned, paused.
    pub fn new(
        tracks: Vec<Track>,
        options: ControllerOptions,
        backend: B,
        view: V,
        scheduler: S,
    ) -> PlayerResult<Self> {
        if tracks.is_empty() {
            return Err(PlayerError::EmptyPlaylist);
        }
        if options.start_index >= tracks.len() {
            return Err(PlayerError::TrackOutOfRange {
                index: options.start_index,
                len: tracks.len(),
            });
        }

        let mut controller = Self {
            backend,
            view,
            scheduler,
            state: PlayerState::new(tracks, options.start_index, options.start_looping),
            drag: SeekDrag::default(),
            bar: BarGeometry::default(),
            sampling: None,
            sample_interval: options.sample_interval,
            autoplay_on_select: options.autoplay_on_select,
            playlist_visible: true,
        };

        controller.backend.set_looping(controller.state.is_looping);
        controller.view.render_progress(&ProgressView::zero());
        controller.load_current();
        controller.render();
        Ok(controller)
    }

    pub fn from_config(config: &PlayerConfig, backend: B, view: V, scheduler: S) -> PlayerResult<Self> {
        config.validate()?;
        Self::new(config.to_tracks(), ControllerOptions::from(config), backend, view, scheduler)
    }

    // -----------------------------------------------------------------------
    // Playback
    // -----------------------------------------------------------------------

    pub fn toggle_play_pause(&mut self) {
        self.set_playing(!self.state.is_playing);
    }

    /// Step to the neighbouring track, wrapping, and always start playing it.
    pub fn change_song(&mut self, forward: bool) {
        let next = self.state.neighbour(forward);
        log_err(self.jump_to(next, true), "change song");
    }

    /// Playlist click: make `index` current without forcing playback.
    ///
    /// Whether the clicked track starts is the `autoplay_on_select` option.
    pub fn select_track(&mut self, index: usize) -> PlayerResult<()> {
        if index == self.state.current_index {
            self.render_playlist();
            return Ok(());
        }
        self.jump_to(index, self.autoplay_on_select)
    }

    /// Load the track at `index`. With `autoplay` playback starts; without it
    /// the player ends up paused on the new track.
    pub fn jump_to(&mut self, index: usize, autoplay: bool) -> PlayerResult<()> {
        let len = self.state.len();
        if index >= len {
            return Err(PlayerError::TrackOutOfRange { index, len });
        }

        let previous = self.state.current_index;
        log::debug!("lyre: track change {} -> {} (autoplay: {})", previous, index, autoplay);

        self.state.current_index = index;
        let loaded = self.load_current();
        self.render_playlist();

        if autoplay && loaded {
            self.set_playing(true);
        } else if self.state.is_playing {
            // Loading stopped the backend; keep the flag honest.
            self.stop_playing();
        }
        Ok(())
    }

    pub fn toggle_loop(&mut self) {
        self.state.is_looping = !self.state.is_looping;
        self.backend.set_looping(self.state.is_looping);
        self.view.set_loop_indicator(self.state.is_looping);
    }

    /// End of the current track.
    ///
    /// A looping backend restarts on its own and never reports the end. If
    /// one arrives anyway (loop switched on after the backend had finished
    /// decoding), the track is restarted here.
    pub fn on_track_ended(&mut self) {
        if self.state.is_looping {
            log::debug!("lyre: track ended while looping, restarting it");
            self.backend.seek(0.0);
            if self.state.is_playing {
                self.set_playing(true);
            }
            self.render_progress();
            return;
        }
        self.change_song(true);
    }

    /// Backend failure reported after the fact (decode error, device loss,
    /// rejected play request).
    pub fn on_media_failed(&mut self, message: &str) {
        log::warn!("lyre: playback of {} failed: {}", self.state.current_track().source, message);
        self.report_error(message.to_string());
        if self.state.is_playing {
            self.stop_playing();
        }
    }

    pub fn on_metadata_loaded(&mut self) {
        self.render_progress();
    }

    /// Body of the sampling subscription. Stray ticks after a cancel, or
    /// before any play, are ignored.
    pub fn on_tick(&mut self) {
        if self.sampling.is_none() {
            return;
        }
        while let Some(event) = self.backend.take_event() {
            match event {
                MediaEvent::Ended => self.on_track_ended(),
                MediaEvent::Failed(message) => self.on_media_failed(&message),
            }
        }
        self.render_progress();
    }

    // -----------------------------------------------------------------------
    // Seeking
    // -----------------------------------------------------------------------

    /// Jump to `fraction` of the track. Out-of-range input is clamped; with
    /// no known duration only the display refreshes.
    pub fn seek_to(&mut self, fraction: f64) {
        let fraction = clamp_fraction(fraction);
        match self.known_duration() {
            Some(duration) => self.backend.seek(fraction * duration),
            None => log::debug!("lyre: seek to {:.3} ignored, duration unknown", fraction),
        }
        self.render_progress();
    }

    pub fn set_bar_geometry(&mut self, bar: BarGeometry) {
        self.bar = bar;
    }

    pub fn begin_seek_drag(&mut self, pointer_x: f64) {
        self.drag.begin();
        self.seek_to(self.bar.fraction_at(pointer_x));
    }

    pub fn update_seek_drag(&mut self, pointer_x: f64) {
        if !self.drag.is_dragging() {
            return;
        }
        self.seek_to(self.bar.fraction_at(pointer_x));
    }

    pub fn end_seek_drag(&mut self) {
        self.drag.end();
    }

    // -----------------------------------------------------------------------
    // View
    // -----------------------------------------------------------------------

    pub fn toggle_playlist(&mut self) {
        self.playlist_visible = !self.playlist_visible;
        self.view.set_playlist_visible(self.playlist_visible);
    }

    /// Redraw everything from current state. Never touches playback.
    pub fn render(&mut self) {
        self.render_playlist();
        self.render_progress();
        self.view.set_track_name(&self.state.current_track().title);
        self.view.set_play_icon(self.play_icon());
        self.view.set_loop_indicator(self.state.is_looping);
        self.view.set_playlist_visible(self.playlist_visible);
        match &self.state.last_error {
            Some(message) => self.view.show_error(message),
            None => self.view.clear_error(),
        }
    }

    // -----------------------------------------------------------------------
    // Event entry point
    // -----------------------------------------------------------------------

    pub fn dispatch(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::PlayPause => self.toggle_play_pause(),
            PlayerEvent::Next => self.change_song(true),
            PlayerEvent::Previous => self.change_song(false),
            PlayerEvent::ToggleLoop => self.toggle_loop(),
            PlayerEvent::TogglePlaylist => self.toggle_playlist(),
            PlayerEvent::SelectTrack { index } => {
                log_err(self.select_track(index), "select track");
            }
            PlayerEvent::Seek { fraction } => self.seek_to(fraction),
            PlayerEvent::ResizeBar { left, width } => self.set_bar_geometry(BarGeometry::new(left, width)),
            PlayerEvent::BeginSeekDrag { pointer_x } => self.begin_seek_drag(pointer_x),
            PlayerEvent::UpdateSeekDrag { pointer_x } => self.update_seek_drag(pointer_x),
            PlayerEvent::EndSeekDrag => self.end_seek_drag(),
            PlayerEvent::MetadataLoaded => self.on_metadata_loaded(),
            PlayerEvent::TrackEnded => self.on_track_ended(),
            PlayerEvent::MediaFailed { message } => self.on_media_failed(&message),
            PlayerEvent::Tick => self.on_tick(),
            PlayerEvent::Render => self.render(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn snapshot(&self) -> Value {
        let mut v = self.state.to_value();
        v["position_secs"] = self.backend.position_secs().into();
        v["duration_secs"] = self.known_duration().map(Value::from).unwrap_or(Value::Null);
        v["playlist_visible"] = self.playlist_visible.into();
        v
    }

    pub fn current_track(&self) -> &Track {
        self.state.current_track()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn is_sampling(&self) -> bool {
        self.sampling.is_some()
    }

    pub fn progress(&self) -> ProgressView {
        ProgressView::compute(self.backend.position_secs(), self.backend.duration_secs())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn set_playing(&mut self, playing: bool) {
        if !playing {
            self.stop_playing();
            return;
        }
        match self.backend.play() {
            Ok(()) => {
                self.state.is_playing = true;
                if self.state.last_error.take().is_some() {
                    self.view.clear_error();
                }
                self.view.set_play_icon(PlayIcon::Pause);
                if self.sampling.is_none() {
                    self.sampling = Some(self.scheduler.subscribe(self.sample_interval));
                }
            }
            Err(e) => {
                log::warn!("lyre: cannot play {}: {}", self.state.current_track().source, e);
                self.report_error(e.to_string());
                self.stop_playing();
            }
        }
    }

    fn stop_playing(&mut self) {
        self.backend.pause();
        self.state.is_playing = false;
        self.view.set_play_icon(PlayIcon::Play);
        if let Some(subscription) = self.sampling.take() {
            subscription.cancel();
        }
    }

    /// Load the current track into the backend and show its name.
    fn load_current(&mut self) -> bool {
        let track = self.state.current_track().clone();
        self.view.set_track_name(&track.title);
        let result = self.backend.load(&track.source);
        self.render_progress();
        match result {
            Ok(()) => {
                if self.state.last_error.take().is_some() {
                    self.view.clear_error();
                }
                true
            }
            Err(e) => {
                log::warn!("lyre: cannot load {}: {}", track.source, e);
                self.report_error(e.to_string());
                false
            }
        }
    }

    fn report_error(&mut self, message: String) {
        self.view.show_error(&message);
        self.state.last_error = Some(message);
    }

    fn known_duration(&self) -> Option<f64> {
        self.backend.duration_secs().filter(|d| d.is_finite() && *d > 0.0)
    }

    fn play_icon(&self) -> PlayIcon {
        if self.state.is_playing {
            PlayIcon::Pause
        } else {
            PlayIcon::Play
        }
    }

    fn render_playlist(&mut self) {
        let rows: Vec<PlaylistRow> = self
            .state
            .songs
            .iter()
            .enumerate()
            .map(|(index, track)| PlaylistRow {
                index,
                title: track.title.clone(),
                active: index == self.state.current_index,
            })
            .collect();
        self.view.render_playlist(&rows);
    }

    fn render_progress(&mut self) {
        let progress = self.progress();
        self.view.render_progress(&progress);
    }
}

impl From<MediaError> for PlayerEvent {
    fn from(e: MediaError) -> Self {
        PlayerEvent::MediaFailed { message: e.to_string() }
    }
}
