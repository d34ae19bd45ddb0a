use std::time::Duration;

use crate::error::MediaError;
use crate::models::MediaEvent;

/// Trait for the host's playback primitive.
///
/// The controller uses this to abstract over native (cpal), browser
/// (`HtmlAudioElement`) and headless backends. All methods take `&self`;
/// backends manage their own interior state.
pub trait MediaBackend {
    /// Replace the current source. Playback stops; position resets to 0.
    fn load(&self, source: &str) -> Result<(), MediaError>;
    /// Start or resume the loaded source.
    fn play(&self) -> Result<(), MediaError>;
    fn pause(&self);
    fn seek(&self, position_secs: f64);
    /// Native loop: restart at end of track instead of reporting it.
    fn set_looping(&self, looping: bool);
    fn position_secs(&self) -> f64;
    /// `None` until the source's metadata is available.
    fn duration_secs(&self) -> Option<f64>;
    /// Next queued notification, for backends that report by polling.
    fn take_event(&self) -> Option<MediaEvent> {
        None
    }
}

/// No-op backend for headless use.
///
/// Accepts every call and never produces audio, a duration or events.
pub struct NoopBackend;

impl MediaBackend for NoopBackend {
    fn load(&self, _: &str) -> Result<(), MediaError> { Ok(()) }
    fn play(&self) -> Result<(), MediaError> { Ok(()) }
    fn pause(&self) {}
    fn seek(&self, _: f64) {}
    fn set_looping(&self, _: bool) {}
    fn position_secs(&self) -> f64 { 0.0 }
    fn duration_secs(&self) -> Option<f64> { None }
}

/// Periodic-callback port: the host's timer.
pub trait Scheduler {
    /// Start delivering progress ticks every `interval` until the returned
    /// subscription is cancelled or dropped.
    fn subscribe(&mut self, interval: Duration) -> Subscription;
}

/// Handle to one live periodic callback. Deregisters on cancel or drop.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("live", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(feature = "native")]
pub mod audio;
#[cfg(feature = "native")]
pub mod probe;
pub mod ticker;
