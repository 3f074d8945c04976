use super::core::{Config, EventLoop};
use crate::source::{ReadinessSource, TimerSource};

use std::time::Duration;

/// Builder for configuring and creating an event loop.
///
/// # Examples
///
/// ```rust,ignore
/// let event_loop = EventLoopBuilder::new()
///     .thread_name("plc-io")
///     .max_wait(Duration::from_millis(100))
///     .build(TimerQueue::new(), PollSockets::new()?);
/// ```
pub struct EventLoopBuilder {
    config: Config,
}

impl EventLoopBuilder {
    /// Creates a builder with default configuration.
    ///
    /// The loop thread is named `tickloop`, uses the platform default stack
    /// size and waits on readiness for as long as the next timer allows.
    pub fn new() -> Self {
        Self {
            config: Config {
                thread_name: String::from("tickloop"),
                stack_size: None,
                max_wait: None,
            },
        }
    }

    /// Sets the name of the loop thread.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// Sets the stack size of the loop thread, in bytes.
    ///
    /// # Panics
    ///
    /// Panics if `size == 0`.
    pub fn stack_size(mut self, size: usize) -> Self {
        assert!(size > 0, "stack_size must be > 0");

        self.config.stack_size = Some(size);
        self
    }

    /// Caps a single readiness wait, giving the loop a bounded poll interval
    /// even when nobody calls [`EventLoop::wake`].
    ///
    /// # Panics
    ///
    /// Panics if `max_wait` is zero.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        assert!(!max_wait.is_zero(), "max_wait must be non-zero");

        self.config.max_wait = Some(max_wait);
        self
    }

    /// Builds an idle event loop around the given collaborators.
    ///
    /// Nothing is initialized and no thread is started until
    /// [`EventLoop::init`] is called.
    pub fn build<T, R>(self, timers: T, sockets: R) -> EventLoop<T, R>
    where
        T: TimerSource,
        R: ReadinessSource,
    {
        EventLoop::with_config(self.config, timers, sockets)
    }
}

impl Default for EventLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
