//! Time source for the position clock
//!
//! Production uses [`SystemClock`]. [`ManualClock`] only moves when told to,
//! which makes playback scenarios deterministic in tests.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;

#[async_trait]
pub trait Clock: Send + Sync {
    /// Suspend for `duration` of this clock's time
    async fn sleep(&self, duration: Duration);
}

/// Tokio timer backed clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock advanced explicitly with [`ManualClock::advance`]
#[derive(Debug)]
pub struct ManualClock {
    now: watch::Sender<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        let (now, _) = watch::channel(Duration::ZERO);
        Self { now }
    }

    /// Elapsed time since creation
    pub fn now(&self) -> Duration {
        *self.now.borrow()
    }

    /// Move time forward, waking every sleeper whose deadline has passed
    pub fn advance(&self, by: Duration) {
        self.now.send_modify(|now| *now += by);
    }
}

#[async_trait]
impl Clock for ManualClock {
    async fn sleep(&self, duration: Duration) {
        let mut rx = self.now.subscribe();
        let deadline = *rx.borrow_and_update() + duration;
        loop {
            if *rx.borrow_and_update() >= deadline {
                return;
            }
            // Sender lives as long as self
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
