use std::time::Duration;

use gloo_timers::callback::Interval;
use lyre_core::{PlayerEvent, Scheduler, Subscription};

use crate::mount::deliver;

/// `setInterval`-backed scheduler. Each tick is delivered as `PlayerEvent::Tick`.
#[derive(Default)]
pub(crate) struct IntervalScheduler;

impl Scheduler for IntervalScheduler {
    fn subscribe(&mut self, interval: Duration) -> Subscription {
        let millis = interval.as_millis().clamp(1, u32::MAX as u128) as u32;
        let handle = Interval::new(millis, || deliver(PlayerEvent::Tick));
        // Dropping the Interval clears it.
        Subscription::new(move || drop(handle))
    }
}
