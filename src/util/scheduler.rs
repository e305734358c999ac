//! Cancellable timers on top of the tokio clock.
//!
//! Both helpers run their callback on a spawned task and hand back a
//! [`ScheduledTask`]; dropping or cancelling it stops the timer. Under a
//! paused tokio clock they follow virtual time, so tests never sleep.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Handle to a running timer
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Run `f` every `period`, first call one period from now.
/// Missed ticks are skipped rather than bursted.
pub fn every<F>(period: Duration, mut f: F) -> ScheduledTask
where
    F: FnMut() + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            f();
        }
    });
    ScheduledTask { handle }
}

/// Run `f` once after `delay`
pub fn after<F>(delay: Duration, f: F) -> ScheduledTask
where
    F: FnOnce() + Send + 'static,
{
    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        f();
    });
    ScheduledTask { handle }
}
