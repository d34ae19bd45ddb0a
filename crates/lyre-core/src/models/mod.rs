//! lyre data models.
//!
//! One state record, one track type, and the tagged event enum hosts
//! use to drive the controller.

pub mod event;
pub mod state;
pub mod track;

pub use event::{MediaEvent, PlayerEvent};
pub use state::{PlaybackStatus, PlayerState};
pub use track::Track;
