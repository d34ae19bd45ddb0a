//! Thread-backed scheduler for native hosts.
//!
//! Each subscription owns one sleeper thread that pushes a tick value into
//! the host's event channel. The host's single event loop receives ticks
//! and UI input on the same channel, so the controller still runs on one
//! thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::{Scheduler, Subscription};

pub struct ThreadTicker<T> {
    tx: Sender<T>,
    tick: T,
}

impl<T: Clone + Send + 'static> ThreadTicker<T> {
    /// `tick` is the value sent on every interval.
    pub fn new(tx: Sender<T>, tick: T) -> Self {
        Self { tx, tick }
    }
}

impl<T: Clone + Send + 'static> Scheduler for ThreadTicker<T> {
    fn subscribe(&mut self, interval: Duration) -> Subscription {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let tx = self.tx.clone();
        let tick = self.tick.clone();

        let spawned = thread::Builder::new()
            .name("lyre-ticker".into())
            .spawn(move || loop {
                thread::sleep(interval);
                if thread_stop.load(Ordering::SeqCst) {
                    break;
                }
                if tx.send(tick.clone()).is_err() {
                    break; // receiver gone
                }
            });
        if let Err(e) = spawned {
            log::error!("lyre: failed to spawn ticker thread: {}", e);
        }

        // Not joined: the sleeper exits on its next wake without sending.
        Subscription::new(move || stop.store(true, Ordering::SeqCst))
    }
}
