//! Session countdown.
//!
//! A [`Countdown`] owns a spawned task that emits one [`TimerEvent::Tick`] per
//! elapsed second with the seconds remaining (`duration - 1` down to `0`),
//! then a single [`TimerEvent::Expired`]. Cancelling or dropping the handle
//! stops the task; no event is delivered afterwards.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

const TICK: Duration = Duration::from_secs(1);

/// An event produced by a running countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// One second has elapsed; `remaining_secs` are left.
    Tick { remaining_secs: u64 },
    /// The countdown reached zero. Always the last event.
    Expired,
}

/// Handle to a running countdown.
#[derive(Debug)]
pub struct Countdown {
    duration_secs: u64,
    events: mpsc::UnboundedReceiver<TimerEvent>,
    task: JoinHandle<()>,
    cancelled: bool,
}

impl Countdown {
    /// Start counting down from `duration_secs`.
    ///
    /// A zero duration expires immediately without ticking. Must be called
    /// from within a tokio runtime.
    pub fn start(duration_secs: u64) -> Self {
        let (tx, events) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            for remaining_secs in (0..duration_secs).rev() {
                ticker.tick().await;
                tracing::trace!(remaining_secs, "countdown tick");
                if tx.send(TimerEvent::Tick { remaining_secs }).is_err() {
                    return;
                }
            }
            let _ = tx.send(TimerEvent::Expired);
        });

        tracing::debug!(duration_secs, "countdown started");
        Self {
            duration_secs,
            events,
            task,
            cancelled: false,
        }
    }

    /// Wait for the next event. Returns `None` once the countdown has been
    /// cancelled or has delivered `Expired`.
    pub async fn next_event(&mut self) -> Option<TimerEvent> {
        if self.cancelled {
            return None;
        }
        self.events.recv().await
    }

    /// Stop the countdown. Idempotent.
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.task.abort();
        self.events.close();
        tracing::debug!(duration_secs = self.duration_secs, "countdown cancelled");
    }

    /// Whether the countdown still may deliver events.
    pub fn is_active(&self) -> bool {
        !self.cancelled && !(self.task.is_finished() && self.events.is_empty())
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel();
    }
}
