//! lyre-core: a music player widget over injected ports.
//!
//! The controller owns the state. Hosts own everything else.
//!
//! # Architecture
//!
//! ```text
//! Layer 0: Ports (MediaBackend, PlayerView, Scheduler)
//! Layer 1: PlayerController (state, transitions, rendering decisions)
//! Layer 2: Hosts (terminal, browser) deliver PlayerEvents, implement ports
//! ```

pub mod config;
pub mod controller;
pub mod drag;
pub mod effects;
pub mod error;
pub mod models;
pub mod time;
pub mod view;

pub use config::PlayerConfig;
pub use controller::{ControllerOptions, PlayerController};
pub use drag::BarGeometry;
pub use effects::{MediaBackend, NoopBackend, Scheduler, Subscription};
pub use error::{MediaError, PlayerError, PlayerResult};
pub use models::*;
pub use time::{format_time, ProgressView};
pub use view::{NullView, PlayIcon, PlayerView, PlaylistRow};

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::time::Duration;

    // -- fakes ------------------------------------------------------------

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Load(String),
        Play,
        Pause,
        Seek(f64),
    }

    #[derive(Default)]
    struct FakeBackend {
        calls: RefCell<Vec<Call>>,
        playing: Cell<bool>,
        looping: Cell<bool>,
        position: Cell<f64>,
        duration: Cell<Option<f64>>,
        fail_play: Cell<bool>,
        unloadable: RefCell<Vec<String>>,
        events: RefCell<VecDeque<MediaEvent>>,
    }

    impl FakeBackend {
        fn with_duration(secs: f64) -> Self {
            let b = Self::default();
            b.duration.set(Some(secs));
            b
        }

        fn plays(&self) -> usize {
            self.calls.borrow().iter().filter(|c| **c == Call::Play).count()
        }

        fn last_load(&self) -> Option<String> {
            self.calls.borrow().iter().rev().find_map(|c| match c {
                Call::Load(s) => Some(s.clone()),
                _ => None,
            })
        }
    }

    impl MediaBackend for FakeBackend {
        fn load(&self, source: &str) -> Result<(), MediaError> {
            self.calls.borrow_mut().push(Call::Load(source.to_string()));
            self.playing.set(false);
            self.position.set(0.0);
            if self.unloadable.borrow().iter().any(|s| s == source) {
                return Err(MediaError::unavailable(source, "missing"));
            }
            Ok(())
        }
        fn play(&self) -> Result<(), MediaError> {
            self.calls.borrow_mut().push(Call::Play);
            if self.fail_play.get() {
                return Err(MediaError::unavailable("current", "unsupported source"));
            }
            self.playing.set(true);
            Ok(())
        }
        fn pause(&self) {
            self.calls.borrow_mut().push(Call::Pause);
            self.playing.set(false);
        }
        fn seek(&self, position_secs: f64) {
            self.calls.borrow_mut().push(Call::Seek(position_secs));
            self.position.set(position_secs);
        }
        fn set_looping(&self, looping: bool) {
            self.looping.set(looping);
        }
        fn position_secs(&self) -> f64 {
            self.position.get()
        }
        fn duration_secs(&self) -> Option<f64> {
            self.duration.get()
        }
        fn take_event(&self) -> Option<MediaEvent> {
            self.events.borrow_mut().pop_front()
        }
    }

    #[derive(Default)]
    struct RecordingView {
        icon: Option<PlayIcon>,
        loop_on: bool,
        track_name: String,
        rows: Vec<PlaylistRow>,
        progress: Option<ProgressView>,
        playlist_visible: Option<bool>,
        error: Option<String>,
    }

    impl PlayerView for RecordingView {
        fn set_play_icon(&mut self, icon: PlayIcon) {
            self.icon = Some(icon);
        }
        fn set_loop_indicator(&mut self, active: bool) {
            self.loop_on = active;
        }
        fn set_track_name(&mut self, name: &str) {
            self.track_name = name.to_string();
        }
        fn render_playlist(&mut self, rows: &[PlaylistRow]) {
            self.rows = rows.to_vec();
        }
        fn render_progress(&mut self, progress: &ProgressView) {
            self.progress = Some(progress.clone());
        }
        fn set_playlist_visible(&mut self, visible: bool) {
            self.playlist_visible = Some(visible);
        }
        fn show_error(&mut self, message: &str) {
            self.error = Some(message.to_string());
        }
        fn clear_error(&mut self) {
            self.error = None;
        }
    }

    #[derive(Default)]
    struct CountingScheduler {
        live: Rc<Cell<usize>>,
        subscribed: Cell<usize>,
    }

    impl Scheduler for CountingScheduler {
        fn subscribe(&mut self, _interval: Duration) -> Subscription {
            self.subscribed.set(self.subscribed.get() + 1);
            self.live.set(self.live.get() + 1);
            let live = Rc::clone(&self.live);
            Subscription::new(move || live.set(live.get() - 1))
        }
    }

    type Player = PlayerController<FakeBackend, RecordingView, CountingScheduler>;

    fn tracks(n: usize) -> Vec<Track> {
        (0..n).map(|i| Track::from_source(format!("/music/{i}.mp3"))).collect()
    }

    fn player_with(n: usize, backend: FakeBackend, options: ControllerOptions) -> Player {
        PlayerController::new(tracks(n), options, backend, RecordingView::default(), CountingScheduler::default())
            .expect("controller")
    }

    fn player(n: usize) -> Player {
        player_with(n, FakeBackend::with_duration(200.0), ControllerOptions::default())
    }

    fn active_rows(p: &Player) -> Vec<usize> {
        p.view().rows.iter().filter(|r| r.active).map(|r| r.index).collect()
    }

    fn live(p: &Player) -> usize {
        p.scheduler().live.get()
    }

    // -- construction -----------------------------------------------------

    #[test]
    fn starts_paused_with_first_track_loaded() {
        let p = player(5);
        assert_eq!(p.state().status(), PlaybackStatus::Paused);
        assert_eq!(p.backend().last_load().as_deref(), Some("/music/0.mp3"));
        assert_eq!(p.view().icon, Some(PlayIcon::Play));
        assert_eq!(p.view().track_name, "0.mp3");
        assert_eq!(active_rows(&p), vec![0]);
        assert_eq!(live(&p), 0);
        assert_eq!(p.backend().plays(), 0);
    }

    #[test]
    fn empty_playlist_is_rejected() {
        let r = PlayerController::new(
            Vec::new(),
            ControllerOptions::default(),
            FakeBackend::default(),
            RecordingView::default(),
            CountingScheduler::default(),
        );
        assert!(matches!(r, Err(PlayerError::EmptyPlaylist)));
    }

    #[test]
    fn from_config_applies_start_options() {
        let config = PlayerConfig {
            tracks: vec!["a.mp3".into(), "b.mp3".into(), "c.mp3".into()],
            start_index: 2,
            start_looping: true,
            ..PlayerConfig::default()
        };
        let p = PlayerController::from_config(&config, FakeBackend::default(), RecordingView::default(), CountingScheduler::default())
            .expect("controller");
        assert_eq!(p.state().current_index, 2);
        assert!(p.state().is_looping);
        assert!(p.backend().looping.get());
        assert!(p.view().loop_on);
    }

    // -- track changes ----------------------------------------------------

    #[test]
    fn next_five_times_visits_every_track_and_plays_each() {
        let mut p = player(5);
        let mut visited = Vec::new();
        for _ in 0..5 {
            p.change_song(true);
            visited.push(p.state().current_index);
            assert!(p.state().is_playing);
            assert!(p.backend().playing.get());
            assert_eq!(active_rows(&p), vec![p.state().current_index]);
        }
        assert_eq!(visited, vec![1, 2, 3, 4, 0]);
        assert_eq!(p.backend().plays(), 5);
        assert_eq!(live(&p), 1);
    }

    #[test]
    fn n_steps_forward_returns_to_start() {
        for n in 1..=6 {
            for start in 0..n {
                let options = ControllerOptions { start_index: start, ..ControllerOptions::default() };
                let mut p = player_with(n, FakeBackend::default(), options);
                for _ in 0..n {
                    p.change_song(true);
                }
                assert_eq!(p.state().current_index, start, "n={n} start={start}");
            }
        }
    }

    #[test]
    fn previous_undoes_next() {
        for start in 0..4 {
            let options = ControllerOptions { start_index: start, ..ControllerOptions::default() };
            let mut p = player_with(4, FakeBackend::default(), options);
            p.change_song(true);
            p.change_song(false);
            assert_eq!(p.state().current_index, start);
            p.change_song(false);
            p.change_song(true);
            assert_eq!(p.state().current_index, start);
        }
    }

    #[test]
    fn previous_from_first_wraps_to_last() {
        let mut p = player(5);
        p.change_song(false);
        assert_eq!(p.state().current_index, 4);
        assert_eq!(p.backend().last_load().as_deref(), Some("/music/4.mp3"));
        assert_eq!(p.view().track_name, "4.mp3");
    }

    #[test]
    fn single_track_next_restarts_it() {
        let mut p = player(1);
        p.change_song(true);
        assert_eq!(p.state().current_index, 0);
        assert!(p.state().is_playing);
    }

    // -- play / pause and sampling ----------------------------------------

    #[test]
    fn pause_cancels_sampling_and_resume_registers_one() {
        let mut p = player(3);
        p.toggle_play_pause();
        assert!(p.state().is_playing);
        assert_eq!(p.view().icon, Some(PlayIcon::Pause));
        assert_eq!(live(&p), 1);

        p.toggle_play_pause();
        assert!(!p.state().is_playing);
        assert!(!p.backend().playing.get());
        assert_eq!(p.view().icon, Some(PlayIcon::Play));
        assert_eq!(live(&p), 0);
        assert!(!p.is_sampling());

        p.toggle_play_pause();
        assert_eq!(live(&p), 1);
        assert_eq!(p.scheduler().subscribed.get(), 2);
    }

    #[test]
    fn rapid_toggling_never_stacks_subscriptions() {
        let mut p = player(3);
        for _ in 0..11 {
            p.toggle_play_pause();
            assert!(live(&p) <= 1);
        }
        assert!(p.state().is_playing);
        assert_eq!(live(&p), 1);
    }

    #[test]
    fn track_change_while_playing_keeps_one_subscription() {
        let mut p = player(3);
        p.toggle_play_pause();
        p.change_song(true);
        p.change_song(true);
        assert_eq!(live(&p), 1);
        assert_eq!(p.scheduler().subscribed.get(), 1);
    }

    #[test]
    fn failed_play_stays_paused_and_shows_error() {
        let backend = FakeBackend::default();
        backend.fail_play.set(true);
        let mut p = player_with(3, backend, ControllerOptions::default());

        p.toggle_play_pause();
        assert!(!p.state().is_playing);
        assert_eq!(live(&p), 0);
        assert!(p.view().error.as_deref().unwrap_or("").contains("unsupported source"));
        assert!(p.state().last_error.is_some());

        p.backend().fail_play.set(false);
        p.toggle_play_pause();
        assert!(p.state().is_playing);
        assert_eq!(p.view().error, None);
        assert_eq!(p.state().last_error, None);
    }

    #[test]
    fn unloadable_track_leaves_player_paused() {
        let backend = FakeBackend::default();
        backend.unloadable.borrow_mut().push("/music/1.mp3".into());
        let mut p = player_with(3, backend, ControllerOptions::default());
        p.toggle_play_pause();

        p.change_song(true);
        assert_eq!(p.state().current_index, 1);
        assert!(!p.state().is_playing);
        assert_eq!(live(&p), 0);
        assert!(p.view().error.is_some());

        // Skipping past it recovers.
        p.change_song(true);
        assert!(p.state().is_playing);
        assert_eq!(p.view().error, None);
    }

    // -- loop and end of track --------------------------------------------

    #[test]
    fn toggle_loop_twice_is_identity() {
        let mut p = player(2);
        p.toggle_loop();
        assert!(p.state().is_looping);
        assert!(p.backend().looping.get());
        assert!(p.view().loop_on);
        p.toggle_loop();
        assert!(!p.state().is_looping);
        assert!(!p.backend().looping.get());
        assert!(!p.view().loop_on);
    }

    #[test]
    fn track_end_while_looping_keeps_index() {
        let mut p = player(3);
        p.toggle_play_pause();
        p.toggle_loop();
        let before = p.backend().calls.borrow().len();
        p.on_track_ended();
        assert_eq!(p.state().current_index, 0);
        assert!(p.state().is_playing);
        let calls = p.backend().calls.borrow()[before..].to_vec();
        assert!(!calls.iter().any(|c| matches!(c, Call::Load(_))));
        assert_eq!(calls, vec![Call::Seek(0.0), Call::Play]);
    }

    #[test]
    fn loop_switched_on_after_backend_finished_restarts_track() {
        let mut p = player(3);
        p.toggle_play_pause();
        p.backend().position.set(199.5);
        // Backend ran out and went silent before the loop flag reached it.
        p.backend().playing.set(false);
        p.backend().events.borrow_mut().push_back(MediaEvent::Ended);
        p.toggle_loop();

        p.on_tick();
        assert_eq!(p.state().current_index, 0);
        assert_eq!(p.state().is_playing, p.backend().playing.get());
        assert!(p.state().is_playing);
        assert!(p.is_sampling());
        assert_eq!(live(&p), 1);
        assert_eq!(p.backend().position.get(), 0.0);
    }

    #[test]
    fn looping_track_end_that_cannot_restart_pauses() {
        let mut p = player(2);
        p.toggle_play_pause();
        p.toggle_loop();
        p.backend().playing.set(false);
        p.backend().fail_play.set(true);
        p.backend().events.borrow_mut().push_back(MediaEvent::Ended);

        p.on_tick();
        assert!(!p.state().is_playing);
        assert_eq!(p.state().is_playing, p.backend().playing.get());
        assert!(!p.is_sampling());
        assert!(p.view().error.is_some());
    }

    #[test]
    fn track_end_advances_and_plays() {
        let mut p = player(3);
        p.toggle_play_pause();
        p.on_track_ended();
        assert_eq!(p.state().current_index, 1);
        assert!(p.state().is_playing);
    }

    #[test]
    fn tick_drains_backend_events() {
        let mut p = player(3);
        p.toggle_play_pause();
        p.backend().events.borrow_mut().push_back(MediaEvent::Ended);
        p.on_tick();
        assert_eq!(p.state().current_index, 1);

        p.backend().events.borrow_mut().push_back(MediaEvent::Failed("device lost".into()));
        p.on_tick();
        assert!(!p.state().is_playing);
        assert_eq!(live(&p), 0);
        assert_eq!(p.view().error.as_deref(), Some("device lost"));
    }

    #[test]
    fn stray_tick_while_paused_is_ignored() {
        let mut p = player(3);
        p.backend().events.borrow_mut().push_back(MediaEvent::Ended);
        p.on_tick();
        assert_eq!(p.state().current_index, 0);
        assert_eq!(p.backend().events.borrow().len(), 1);
    }

    #[test]
    fn tick_refreshes_progress() {
        let mut p = player(3);
        p.toggle_play_pause();
        p.backend().position.set(65.0);
        p.on_tick();
        let progress = p.view().progress.clone().expect("progress");
        assert_eq!(progress.elapsed, "1:05");
        assert_eq!(progress.remaining, "- 2:15");
        assert!((progress.percent - 32.5).abs() < 1e-9);
    }

    #[test]
    fn metadata_arrival_shows_duration() {
        let mut p = player_with(2, FakeBackend::default(), ControllerOptions::default());
        assert_eq!(p.view().progress.clone().expect("progress").remaining, "- 0:00");

        p.backend().duration.set(Some(90.0));
        p.on_metadata_loaded();
        let progress = p.view().progress.clone().expect("progress");
        assert_eq!(progress.elapsed, "0:00");
        assert_eq!(progress.remaining, "- 1:30");
    }

    // -- seeking ----------------------------------------------------------

    #[test]
    fn seek_maps_fraction_to_duration() {
        let mut p = player(2);
        p.seek_to(0.0);
        assert_eq!(p.backend().position.get(), 0.0);
        p.seek_to(1.0);
        assert!((p.backend().position.get() - 200.0).abs() < 1e-9);
        p.seek_to(0.25);
        assert!((p.backend().position.get() - 50.0).abs() < 1e-9);
        assert_eq!(p.view().progress.as_ref().map(|pr| pr.elapsed.as_str()), Some("0:50"));
    }

    #[test]
    fn seek_out_of_range_is_clamped() {
        let mut p = player(2);
        p.seek_to(3.0);
        assert!((p.backend().position.get() - 200.0).abs() < 1e-9);
        p.seek_to(-1.0);
        assert_eq!(p.backend().position.get(), 0.0);
        p.seek_to(f64::NAN);
        assert_eq!(p.backend().position.get(), 0.0);
    }

    #[test]
    fn seek_without_duration_only_refreshes() {
        let mut p = player_with(2, FakeBackend::default(), ControllerOptions::default());
        p.seek_to(0.5);
        assert!(!p.backend().calls.borrow().iter().any(|c| matches!(c, Call::Seek(_))));
        let progress = p.view().progress.clone().expect("progress");
        assert_eq!(progress.percent, 0.0);
        assert_eq!(progress.elapsed, "0:00");
    }

    #[test]
    fn drag_seeks_with_clamped_pointer() {
        let mut p = player(2);
        p.set_bar_geometry(BarGeometry::new(10.0, 100.0));

        p.begin_seek_drag(60.0);
        assert!(p.is_dragging());
        assert!((p.backend().position.get() - 100.0).abs() < 1e-9);

        p.update_seek_drag(500.0);
        assert!((p.backend().position.get() - 200.0).abs() < 1e-9);
        p.update_seek_drag(-40.0);
        assert_eq!(p.backend().position.get(), 0.0);

        p.end_seek_drag();
        assert!(!p.is_dragging());
        p.update_seek_drag(35.0);
        assert_eq!(p.backend().position.get(), 0.0);
    }

    #[test]
    fn pointer_moves_without_drag_do_nothing() {
        let mut p = player(2);
        p.set_bar_geometry(BarGeometry::new(0.0, 100.0));
        p.update_seek_drag(50.0);
        assert!(!p.backend().calls.borrow().iter().any(|c| matches!(c, Call::Seek(_))));
    }

    // -- playlist selection -----------------------------------------------

    #[test]
    fn select_without_autoplay_loads_and_pauses() {
        let mut p = player(4);
        p.toggle_play_pause();
        p.select_track(2).unwrap();
        assert_eq!(p.state().current_index, 2);
        assert_eq!(p.backend().last_load().as_deref(), Some("/music/2.mp3"));
        assert_eq!(active_rows(&p), vec![2]);
        assert!(!p.state().is_playing);
        assert!(!p.backend().playing.get());
        assert_eq!(live(&p), 0);
    }

    #[test]
    fn select_with_autoplay_plays_selected() {
        let options = ControllerOptions { autoplay_on_select: true, ..ControllerOptions::default() };
        let mut p = player_with(4, FakeBackend::default(), options);
        p.select_track(3).unwrap();
        assert_eq!(p.state().current_index, 3);
        assert!(p.state().is_playing);
        assert_eq!(live(&p), 1);
    }

    #[test]
    fn select_current_track_does_not_restart() {
        let mut p = player(3);
        p.toggle_play_pause();
        let calls = p.backend().calls.borrow().len();
        p.select_track(0).unwrap();
        assert_eq!(p.backend().calls.borrow().len(), calls);
        assert!(p.state().is_playing);
    }

    #[test]
    fn select_out_of_range_changes_nothing() {
        let mut p = player(3);
        let err = p.select_track(3).unwrap_err();
        assert!(matches!(err, PlayerError::TrackOutOfRange { index: 3, len: 3 }));
        assert_eq!(p.state().current_index, 0);
        assert_eq!(active_rows(&p), vec![0]);
    }

    // -- rendering and dispatch -------------------------------------------

    #[test]
    fn render_is_idempotent_and_side_effect_free() {
        let mut p = player(3);
        p.toggle_play_pause();
        let calls = p.backend().calls.borrow().len();
        p.render();
        p.render();
        assert_eq!(p.backend().calls.borrow().len(), calls);
        assert!(p.state().is_playing);
        assert_eq!(p.view().icon, Some(PlayIcon::Pause));
        assert_eq!(active_rows(&p), vec![0]);
        assert_eq!(p.view().rows.len(), 3);
    }

    #[test]
    fn playlist_visibility_toggles() {
        let mut p = player(2);
        p.toggle_playlist();
        assert_eq!(p.view().playlist_visible, Some(false));
        p.toggle_playlist();
        assert_eq!(p.view().playlist_visible, Some(true));
    }

    #[test]
    fn dispatch_json_events() {
        let mut p = player(3);
        let script = serde_json::json!([
            {"action": "play_pause"},
            {"action": "next"},
            {"action": "toggle_loop"},
            {"action": "resize_bar", "left": 0.0, "width": 50.0},
            {"action": "begin_seek_drag", "pointer_x": 25.0},
            {"action": "end_seek_drag"},
            {"action": "select_track", "index": 9},
        ]);
        for v in script.as_array().expect("array") {
            p.dispatch(PlayerEvent::from_value(v).expect("event"));
        }
        assert_eq!(p.state().current_index, 1);
        assert!(p.state().is_playing);
        assert!(p.state().is_looping);
        assert!((p.backend().position.get() - 100.0).abs() < 1e-9);

        let snap = p.snapshot();
        assert_eq!(snap["status"], "playing");
        assert_eq!(snap["duration_secs"], 200.0);
    }

    #[test]
    fn headless_player_runs_on_noop_ports() {
        let mut p = PlayerController::from_config(
            &PlayerConfig::default(),
            NoopBackend,
            NullView,
            CountingScheduler::default(),
        )
        .expect("controller");
        p.toggle_play_pause();
        p.seek_to(0.5);
        p.on_tick();
        assert!(p.state().is_playing);
        assert_eq!(p.progress().remaining, "- 0:00");
    }
}
