//! Session timer task
//!
//! A running duration session owns one `SessionTimer`. The timer spawns a
//! task that adds one second per real second to a `watch` channel; dropping
//! the timer aborts the task, so a session can never outlive its control.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

const TICK: Duration = Duration::from_secs(1);

pub struct SessionTimer {
    elapsed: watch::Receiver<u64>,
    handle: JoinHandle<()>,
}

impl SessionTimer {
    /// Start ticking from `initial` seconds
    ///
    /// Must be called within a tokio runtime.
    pub fn start(initial: u64) -> Self {
        let (tx, rx) = watch::channel(initial);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tx.send_modify(|elapsed| *elapsed += 1);
            }
        });

        Self {
            elapsed: rx,
            handle,
        }
    }

    /// Seconds counted so far
    pub fn elapsed(&self) -> u64 {
        *self.elapsed.borrow()
    }

    /// Receiver for rendering the ticking value
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.elapsed.clone()
    }

    /// Stop ticking and return the final elapsed seconds
    pub fn stop(self) -> u64 {
        self.elapsed()
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
