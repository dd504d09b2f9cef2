use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Sender};

/// Sets a shared flag after a wall-clock duration, unless cancelled first.
///
/// The flag transitions false -> true exactly once and is never reset, so
/// readers only need an acquire load at their loop heads. Cancelling
/// wakes the timer thread immediately and joins it.
pub struct StoppableTimer {
    cancel: Sender<()>,
    handle: JoinHandle<()>,
}

impl StoppableTimer {
    pub fn start(after: Duration, flag: Arc<AtomicBool>) -> StoppableTimer {
        let (cancel, cancelled) = bounded::<()>(1);
        let handle = thread::spawn(move || {
            select! {
                recv(cancelled) -> _ => {}
                default(after) => flag.store(true, Ordering::Release),
            }
        });
        StoppableTimer { cancel, handle }
    }

    /// Stops the timer. The flag keeps whatever value it has at this
    /// point: cancelling after expiry does not clear it.
    pub fn cancel(self) {
        let _ = self.cancel.send(());
        let _ = self.handle.join();
    }
}
