use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

/// Work run on the loop thread when a timer fires.
pub(crate) type Callback = Box<dyn FnOnce() + Send + 'static>;

/// An entry in the timer queue.
///
/// Entries live in a [`BinaryHeap`](std::collections::BinaryHeap) ordered so
/// that the earliest deadline is popped first. Timers sharing a deadline
/// fire in scheduling order.
pub(crate) struct TimerEntry {
    /// The time at which the timer should fire.
    pub(crate) deadline: Instant,

    /// Scheduling order, used to break deadline ties.
    pub(crate) seq: u64,

    pub(crate) callback: Callback,

    /// Cancellation flag shared with the [`Timer`](super::Timer) handle.
    pub(crate) cancelled: Arc<AtomicBool>,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    /// Reversed so that a max-heap pops the earliest `(deadline, seq)` first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
