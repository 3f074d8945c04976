//! Collaborator interfaces driven by the event loop.
//!
//! The loop itself owns no timers and no sockets. Each tick it asks a
//! [`TimerSource`] to fire whatever is due, then hands the earliest remaining
//! deadline to a [`ReadinessSource`] as the upper bound of its blocking wait.
//!
//! Both traits are implemented by the reference collaborators in
//! [`crate::timer`] and `crate::socket`, and by the fakes in the test suites.

use std::io;
use std::sync::Arc;
use std::time::Instant;

/// A queue of software timers.
///
/// Implementations are driven exclusively from the loop thread.
pub trait TimerSource: Send + 'static {
    /// Prepares the queue before the loop thread starts.
    fn initialize(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Runs every timer whose deadline is at or before `now`.
    ///
    /// Returns the earliest deadline among the timers still pending, or
    /// `None` when nothing is scheduled.
    ///
    /// Must not block.
    fn process_due(&mut self, now: Instant) -> Option<Instant>;

    /// Releases the queue after the loop thread has exited.
    fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A socket readiness multiplexer.
pub trait ReadinessSource: Send + 'static {
    /// Cross-thread handle that interrupts [`wait`](Self::wait).
    type Waker: Wake;

    /// Prepares the multiplexer before the loop thread starts.
    fn initialize(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Returns a handle able to interrupt a blocked wait from any thread.
    fn waker(&self) -> Self::Waker;

    /// Blocks until a socket is ready, a wake arrives, or `deadline` passes.
    ///
    /// Ready sockets are serviced before returning. `None` means there is no
    /// deadline and only readiness or a wake ends the wait.
    fn wait(&mut self, deadline: Option<Instant>) -> io::Result<WakeReason>;

    /// Releases the multiplexer after the loop thread has exited.
    fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Out-of-band signal that cuts a blocked wait short.
///
/// A wake delivered while no wait is in progress must be latched so the
/// next wait returns immediately.
pub trait Wake: Send + Sync + 'static {
    fn wake(&self);
}

impl<W: Wake + ?Sized> Wake for Arc<W> {
    fn wake(&self) {
        (**self).wake();
    }
}

/// Why a readiness wait returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// This many sockets were ready and have been serviced.
    Ready(usize),

    /// A wake signal interrupted the wait.
    Woken,

    /// The deadline passed with nothing to do.
    Timeout,
}
