//! Matching late `play()` promise rejections to the request that made them.

use std::cell::Cell;
use std::rc::Rc;

/// `DOMException.name` of a play request interrupted by `pause()` or `load()`.
const ABORT_ERROR: &str = "AbortError";

/// Generation counter shared between the backend and its pending promises.
///
/// `begin` hands out a ticket per play request; `invalidate` (on pause and
/// load) moves the generation on so older tickets stop being current.
#[derive(Debug, Default, Clone)]
pub(crate) struct PlayGuard {
    generation: Rc<Cell<u64>>,
}

impl PlayGuard {
    pub(crate) fn begin(&self) -> u64 {
        self.invalidate();
        self.generation.get()
    }

    pub(crate) fn invalidate(&self) {
        self.generation.set(self.generation.get().wrapping_add(1));
    }

    pub(crate) fn is_current(&self, ticket: u64) -> bool {
        self.generation.get() == ticket
    }

    /// Whether a rejection for `ticket` is a real playback failure.
    pub(crate) fn should_report(&self, ticket: u64, error_name: Option<&str>) -> bool {
        self.is_current(ticket) && error_name != Some(ABORT_ERROR)
    }
}
