use super::entry::TimerEntry;
use super::handle::TimerHandle;
use crate::source::TimerSource;
use crate::utils::panic_message;

use std::collections::BinaryHeap;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, channel};
use std::time::Instant;
use tracing::{debug, error, info, trace};

/// The reference timer collaborator.
///
/// A min-heap of one-shot timers fed through a channel by any number of
/// [`TimerHandle`]s. Callbacks run synchronously on the loop thread.
pub struct TimerQueue {
    /// Timers scheduled since the last tick.
    receiver: Receiver<TimerEntry>,

    /// Kept so the channel stays open and new handles can be cloned off it.
    handle: TimerHandle,

    /// Pending timers ordered by deadline.
    timers: BinaryHeap<TimerEntry>,

    /// Cancellations since the last prune, bumped by [`Timer::cancel`](super::Timer::cancel).
    cancellations: Arc<AtomicUsize>,
}

impl TimerQueue {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        let cancellations = Arc::new(AtomicUsize::new(0));

        Self {
            receiver,
            handle: TimerHandle::new(sender, cancellations.clone()),
            timers: BinaryHeap::new(),
            cancellations,
        }
    }

    /// Returns a handle for scheduling timers on this queue.
    pub fn handle(&self) -> TimerHandle {
        self.handle.clone()
    }

    /// Number of timers currently held by the queue, cancelled ones included.
    ///
    /// Timers still in flight on the channel are not counted.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Moves newly scheduled timers into the heap.
    fn collect(&mut self) {
        while let Ok(entry) = self.receiver.try_recv() {
            self.timers.push(entry);
        }
    }

    /// Drops cancelled timers sitting at the front of the heap.
    fn discard_cancelled(&mut self) {
        while let Some(top) = self.timers.peek() {
            if !top.cancelled.load(Ordering::Acquire) {
                break;
            }

            self.timers.pop();
        }
    }

    /// Rebuilds the heap without cancelled timers once they outnumber the
    /// live ones.
    ///
    /// Cancelled timers otherwise leave the heap only when they reach the
    /// front, which a far-future timeout may never do.
    fn prune(&mut self) {
        let cancelled = self.cancellations.load(Ordering::Relaxed);
        if cancelled == 0 || cancelled * 2 <= self.timers.len() {
            return;
        }

        self.cancellations.store(0, Ordering::Relaxed);

        let before = self.timers.len();
        self.timers.retain(|entry| !entry.cancelled.load(Ordering::Acquire));

        debug!(
            pruned = before - self.timers.len(),
            pending = self.timers.len(),
            "pruned cancelled timers"
        );
    }

    /// Pops the earliest live timer if it is due.
    fn pop_due(&mut self, now: Instant) -> Option<TimerEntry> {
        self.discard_cancelled();

        match self.timers.peek() {
            Some(top) if top.deadline <= now => self.timers.pop(),
            _ => None,
        }
    }

    fn fire(entry: TimerEntry) {
        let seq = entry.seq;
        trace!(seq, "firing timer");

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(entry.callback)) {
            error!(seq, reason = %panic_message(payload.as_ref()), "timer callback panicked");
        }
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerSource for TimerQueue {
    fn initialize(&mut self) -> io::Result<()> {
        debug!(pending = self.timers.len(), "timer queue ready");
        Ok(())
    }

    /// Fires due timers, including any that callbacks schedule with a
    /// deadline already at or before `now`.
    fn process_due(&mut self, now: Instant) -> Option<Instant> {
        self.collect();
        self.prune();

        while let Some(entry) = self.pop_due(now) {
            Self::fire(entry);

            // Callbacks may schedule follow-up timers.
            self.collect();
        }

        self.discard_cancelled();
        self.timers.peek().map(|top| top.deadline)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.collect();

        let discarded = self.timers.len();
        self.timers.clear();
        self.cancellations.store(0, Ordering::Relaxed);

        info!(discarded, "timer queue shut down");
        Ok(())
    }
}
