use super::entry::TimerEntry;
use crate::utils::deadline_after;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// A cloneable handle used to schedule timers from any thread.
///
/// Scheduled timers are picked up by the queue at the start of its next
/// tick. A loop blocked on a stale deadline will not notice a new, earlier
/// timer until it is woken, so producers outside the loop thread should call
/// [`EventLoop::wake`](crate::EventLoop::wake) after scheduling.
#[derive(Clone)]
pub struct TimerHandle {
    sender: Sender<TimerEntry>,
    seq: Arc<AtomicU64>,

    /// Cancellations not yet pruned, shared with the queue.
    cancellations: Arc<AtomicUsize>,
}

impl TimerHandle {
    pub(crate) fn new(sender: Sender<TimerEntry>, cancellations: Arc<AtomicUsize>) -> Self {
        Self {
            sender,
            seq: Arc::new(AtomicU64::new(0)),
            cancellations,
        }
    }

    /// Schedules `callback` to run on the loop thread at `deadline`.
    ///
    /// A deadline in the past fires on the next tick.
    pub fn schedule_at<F>(&self, deadline: Instant, callback: F) -> Timer
    where
        F: FnOnce() + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);

        let entry = TimerEntry {
            deadline,
            seq,
            callback: Box::new(callback),
            cancelled: cancelled.clone(),
        };

        if self.sender.send(entry).is_err() {
            debug!("timer queue is gone; timer discarded");
            cancelled.store(true, Ordering::Release);
        } else {
            trace!(seq, "timer scheduled");
        }

        Timer {
            deadline,
            cancelled,
            cancellations: self.cancellations.clone(),
        }
    }

    /// Schedules `callback` to run on the loop thread after `delay`.
    ///
    /// Delays too large to represent, such as `Duration::MAX`, are clamped to
    /// a deadline about 30 years out.
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> Timer
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_at(deadline_after(Instant::now(), delay), callback)
    }
}

/// A scheduled timer.
///
/// Dropping a `Timer` does **not** cancel it; call [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct Timer {
    deadline: Instant,
    cancelled: Arc<AtomicBool>,
    cancellations: Arc<AtomicUsize>,
}

impl Timer {
    /// Prevents the callback from running if it has not fired yet.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            self.cancellations.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}
