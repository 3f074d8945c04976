use crate::source::{ReadinessSource, TimerSource, WakeReason};

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, trace};

/// Longest pause after a failed readiness wait before the next tick.
const ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// One iteration of the event loop.
///
/// A `Tickler` pairs a timer source with a readiness source. Each
/// [`tick`](Self::tick) fires the due timers and then blocks on socket
/// readiness for no longer than the next timer deadline.
pub struct Tickler<T, R> {
    timers: T,
    sockets: R,

    /// Upper bound on a single readiness wait, if any.
    max_wait: Option<Duration>,
}

impl<T: TimerSource, R: ReadinessSource> Tickler<T, R> {
    pub fn new(timers: T, sockets: R) -> Self {
        Self {
            timers,
            sockets,
            max_wait: None,
        }
    }

    /// Caps every readiness wait at `max_wait`, even when no timer is pending.
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Runs one tick.
    ///
    /// Due timers always run before the readiness wait starts, and the wait
    /// never outlives the earliest remaining timer deadline.
    ///
    /// A failing wait is logged and swallowed. The tick then pauses for at
    /// most [`ERROR_BACKOFF`] (never past the deadline) so a persistently
    /// broken source cannot spin the thread.
    pub fn tick(&mut self) -> WakeReason {
        let now = Instant::now();

        let next = self.timers.process_due(now);
        let deadline = bound(next, now, self.max_wait);

        trace!(?deadline, "waiting for readiness");

        match self.sockets.wait(deadline) {
            Ok(reason) => {
                trace!(?reason, "tick complete");
                reason
            }
            Err(e) => {
                error!(error = %e, "readiness wait failed");

                let pause = deadline
                    .map(|d| d.saturating_duration_since(Instant::now()))
                    .map_or(ERROR_BACKOFF, |left| left.min(ERROR_BACKOFF));
                thread::sleep(pause);

                WakeReason::Timeout
            }
        }
    }

    /// Ticks until `shutdown` is observed, then hands the collaborators back.
    ///
    /// The flag is checked between ticks only.
    pub(crate) fn run(mut self, shutdown: &AtomicBool) -> (T, R) {
        info!("event loop thread started");

        let mut ticks: u64 = 0;
        while !shutdown.load(Ordering::Acquire) {
            self.tick();
            ticks += 1;
        }

        info!(ticks, "event loop thread exiting");

        self.into_parts()
    }

    pub fn timers(&self) -> &T {
        &self.timers
    }

    pub fn sockets(&self) -> &R {
        &self.sockets
    }

    pub fn into_parts(self) -> (T, R) {
        (self.timers, self.sockets)
    }
}

/// Combines the next timer deadline with the optional wait cap.
///
/// A cap that cannot be added to `now` is treated as no cap.
fn bound(next: Option<Instant>, now: Instant, max_wait: Option<Duration>) -> Option<Instant> {
    match (next, max_wait.and_then(|cap| now.checked_add(cap))) {
        (Some(next), Some(cap)) => Some(next.min(cap)),
        (next, cap) => next.or(cap),
    }
}
