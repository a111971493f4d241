//! Repeating poll timer

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Observable state of a [`PollTimer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerStatus {
    pub running: bool,
    /// Interval of the running timer
    pub interval: Option<Duration>,
    /// Number of times the timer has been (re)started
    pub schedules: u64,
}

/// A cancellable repeating timer. Each tick spawns the tick future as its
/// own task, so a slow tick never delays the next one.
#[derive(Debug, Default)]
pub struct PollTimer {
    handle: Option<JoinHandle<()>>,
    interval: Option<Duration>,
    schedules: u64,
}

impl PollTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop any running timer and start a new one firing every `interval`.
    /// The first tick fires one interval from now.
    pub fn schedule<F, Fut>(&mut self, interval: Duration, tick: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();

        info!("Polling every {:?}", interval);
        self.handle = Some(tokio::spawn(run(interval, tick)));
        self.interval = Some(interval);
        self.schedules += 1;
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("Stopping poll timer ({:?})", self.interval);
            handle.abort();
        }
        self.interval = None;
    }

    pub fn status(&self) -> PollerStatus {
        PollerStatus {
            running: self.handle.is_some(),
            interval: self.interval,
            schedules: self.schedules,
        }
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<F, Fut>(interval: Duration, tick: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    loop {
        tokio::time::sleep(interval).await;
        debug!("Poll tick");
        tokio::spawn(tick());
    }
}
