//! The process-wide default event loop.
//!
//! Libraries that want a single loop per process without threading a handle
//! through every call use these free functions. The default loop pairs a
//! [`TimerQueue`] with [`PollSockets`] and is created lazily by the first
//! [`event_loop_init`].

use crate::error::{InitError, TeardownError};
use crate::event_loop::{EventLoop, EventLoopBuilder};
use crate::socket::{PollSockets, SocketHandle};
use crate::timer::{Timer, TimerHandle, TimerQueue};
use crate::utils::deadline_after;

use parking_lot::{Mutex, const_mutex};
use std::error::Error;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

static DEFAULT: Mutex<Option<Arc<DefaultLoop>>> = const_mutex(None);

/// An event loop wired to the reference collaborators.
///
/// Besides the loop itself this keeps the producer handles for its timer
/// queue and socket poller.
pub struct DefaultLoop {
    event_loop: EventLoop<TimerQueue, PollSockets>,
    timers: TimerHandle,
    sockets: SocketHandle,
}

impl DefaultLoop {
    /// Creates an idle loop with default configuration.
    pub fn new() -> io::Result<Self> {
        Self::with_builder(EventLoopBuilder::new())
    }

    /// Creates an idle loop configured by `builder`.
    pub fn with_builder(builder: EventLoopBuilder) -> io::Result<Self> {
        let queue = TimerQueue::new();
        let poller = PollSockets::new()?;

        let timers = queue.handle();
        let sockets = poller.handle();

        Ok(Self {
            event_loop: builder.build(queue, poller),
            timers,
            sockets,
        })
    }

    pub fn event_loop(&self) -> &EventLoop<TimerQueue, PollSockets> {
        &self.event_loop
    }

    pub fn timers(&self) -> &TimerHandle {
        &self.timers
    }

    pub fn sockets(&self) -> &SocketHandle {
        &self.sockets
    }

    /// Schedules `callback` after `delay` and wakes the loop so the new
    /// deadline is taken into account.
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> Timer
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_at(deadline_after(Instant::now(), delay), callback)
    }

    /// Schedules `callback` at `deadline` and wakes the loop.
    pub fn schedule_at<F>(&self, deadline: Instant, callback: F) -> Timer
    where
        F: FnOnce() + Send + 'static,
    {
        let timer = self.timers.schedule_at(deadline, callback);
        self.event_loop.wake();
        timer
    }
}

/// Returns the default loop, if [`event_loop_init`] has ever created it.
pub fn default_loop() -> Option<Arc<DefaultLoop>> {
    DEFAULT.lock().clone()
}

/// Starts the default loop, creating it on first use.
pub fn event_loop_init() -> Result<(), InitError> {
    let mut slot = DEFAULT.lock();

    let default = match &*slot {
        Some(default) => default.clone(),
        None => {
            let default = Arc::new(DefaultLoop::new().map_err(InitError::Sockets)?);
            *slot = Some(default.clone());
            default
        }
    };

    default.event_loop.init()
}

/// Stops the default loop, reporting the outcome.
pub fn event_loop_try_teardown() -> Result<(), TeardownError> {
    // Not holding the slot while joining keeps `event_loop_wake` responsive.
    let Some(default) = default_loop() else {
        debug!("teardown requested before the default event loop existed");
        return Err(TeardownError::NotRunning);
    };

    default.event_loop.teardown()
}

/// Stops the default loop.
///
/// Failures are logged and otherwise ignored. Use
/// [`event_loop_try_teardown`] to observe them.
pub fn event_loop_teardown() {
    if let Err(e) = event_loop_try_teardown() {
        warn!(error = &e as &dyn Error, "default event loop teardown failed");
    }
}

/// Wakes the default loop if it is running.
pub fn event_loop_wake() {
    match default_loop() {
        Some(default) => default.event_loop.wake(),
        None => debug!("wake requested before the default event loop existed"),
    }
}
