//! Recurring reconnect tick

use super::LinkEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Background task posting `LinkEvent::ReconnectTick` every `period`
///
/// The first tick fires one full period after creation. Dropping the timer
/// stops it.
pub(crate) struct ReconnectTimer {
    task: JoinHandle<()>,
    period: Duration,
}

impl ReconnectTimer {
    pub(crate) fn start(period: Duration, events: mpsc::UnboundedSender<LinkEvent>) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if events.send(LinkEvent::ReconnectTick).is_err() {
                    break;
                }
            }
        });
        Self { task, period }
    }

    pub(crate) fn period(&self) -> Duration {
        self.period
    }

    pub(crate) fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
