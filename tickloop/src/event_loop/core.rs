use super::builder::EventLoopBuilder;
use super::tickler::Tickler;
use crate::error::{InitError, TeardownError};
use crate::source::{ReadinessSource, TimerSource, Wake};
use crate::utils::panic_message;

use parking_lot::Mutex;
use std::error::Error;
use std::io;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Settings fixed at build time.
pub(crate) struct Config {
    pub(crate) thread_name: String,
    pub(crate) stack_size: Option<usize>,
    pub(crate) max_wait: Option<Duration>,
}

/// The loop thread returns the collaborators when it exits.
type LoopThread<T, R> = JoinHandle<Option<(T, R)>>;

enum State<T: TimerSource, R: ReadinessSource> {
    /// Not running. The collaborators are parked here between runs.
    Idle { timers: T, sockets: R },

    Running {
        handle: LoopThread<T, R>,
        waker: R::Waker,
    },

    /// Shutdown requested, join in progress.
    Stopping { waker: R::Waker },

    /// The loop thread could not be joined. Terminal.
    Poisoned,
}

/// A background event loop.
///
/// `EventLoop` owns one dedicated thread that repeatedly fires due timers
/// from a [`TimerSource`] and then blocks on a [`ReadinessSource`], bounded
/// by the next timer deadline. Other threads only interact with it through
/// [`init`](Self::init), [`teardown`](Self::teardown) and
/// [`wake`](Self::wake).
///
/// The loop is restartable: after a successful teardown it can be
/// initialized again with the same collaborators.
///
/// Dropping a running loop tears it down and logs any failure.
pub struct EventLoop<T: TimerSource, R: ReadinessSource> {
    config: Config,

    /// Set by teardown, read by the loop thread before every tick.
    shutdown: Arc<AtomicBool>,

    state: Mutex<State<T, R>>,
}

impl<T: TimerSource, R: ReadinessSource> EventLoop<T, R> {
    /// Creates an idle loop with default configuration.
    ///
    /// See [`EventLoopBuilder`] to customize the loop thread.
    pub fn new(timers: T, sockets: R) -> Self {
        EventLoopBuilder::new().build(timers, sockets)
    }

    pub(crate) fn with_config(config: Config, timers: T, sockets: R) -> Self {
        Self {
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(State::Idle { timers, sockets }),
        }
    }

    /// Starts the loop.
    ///
    /// Initializes the timer source, then the readiness source, then spawns
    /// the loop thread. The first failing step is returned immediately and
    /// no thread is spawned. Steps that already succeeded are not undone.
    pub fn init(&self) -> Result<(), InitError> {
        let mut state = self.state.lock();

        // Initialized in place, so a panicking collaborator leaves the loop
        // idle and startable.
        let (timers, sockets) = match &mut *state {
            State::Idle { timers, sockets } => (timers, sockets),
            State::Poisoned => {
                error!("refusing to start a poisoned event loop");
                return Err(InitError::Poisoned);
            }
            State::Running { .. } | State::Stopping { .. } => {
                warn!("event loop is already running");
                return Err(InitError::AlreadyRunning);
            }
        };

        info!(thread = %self.config.thread_name, "starting event loop");

        if let Err(e) = timers.initialize() {
            error!(error = %e, "unable to initialize timer source");
            return Err(InitError::Timers(e));
        }

        if let Err(e) = sockets.initialize() {
            error!(error = %e, "unable to initialize readiness source");
            return Err(InitError::Sockets(e));
        }

        let waker = sockets.waker();

        let (timers, sockets) = match mem::replace(&mut *state, State::Poisoned) {
            State::Idle { timers, sockets } => (timers, sockets),
            other => {
                *state = other;
                return Err(InitError::AlreadyRunning);
            }
        };

        let tickler = Tickler::new(timers, sockets).with_max_wait(self.config.max_wait);

        match self.spawn(tickler) {
            Ok(handle) => {
                *state = State::Running { handle, waker };
                info!("event loop started");
                Ok(())
            }
            Err((e, tickler)) => {
                error!(error = %e, "unable to create event loop thread");
                if let Some(tickler) = tickler {
                    let (timers, sockets) = tickler.into_parts();
                    *state = State::Idle { timers, sockets };
                }
                Err(InitError::Spawn(e))
            }
        }
    }

    /// Spawns the loop thread.
    ///
    /// The tickler goes through a shared slot so it can be recovered when
    /// the thread cannot be created.
    fn spawn(
        &self,
        tickler: Tickler<T, R>,
    ) -> Result<LoopThread<T, R>, (io::Error, Option<Tickler<T, R>>)> {
        let slot = Arc::new(Mutex::new(Some(tickler)));
        let shutdown = self.shutdown.clone();

        let mut builder = thread::Builder::new().name(self.config.thread_name.clone());
        if let Some(size) = self.config.stack_size {
            builder = builder.stack_size(size);
        }

        let spawned = builder.spawn({
            let slot = slot.clone();
            move || {
                let tickler = slot.lock().take();
                tickler.map(|tickler| tickler.run(&shutdown))
            }
        });

        spawned.map_err(|e| (e, slot.lock().take()))
    }

    /// Stops the loop.
    ///
    /// Sets the shutdown flag, wakes the loop and joins its thread, then
    /// resets the flag and shuts down the readiness source followed by the
    /// timer source. Teardown stops at the first failing step.
    ///
    /// A loop thread that panicked cannot be joined cleanly. The loop is then
    /// poisoned and refuses any further `init` or `teardown`.
    pub fn teardown(&self) -> Result<(), TeardownError> {
        let handle = {
            let mut state = self.state.lock();

            match mem::replace(&mut *state, State::Poisoned) {
                State::Running { handle, waker } => {
                    if handle.thread().id() == thread::current().id() {
                        *state = State::Running { handle, waker };
                        error!("event loop teardown requested from the loop thread");
                        return Err(TeardownError::FromLoopThread);
                    }

                    *state = State::Stopping { waker };
                    handle
                }
                State::Poisoned => {
                    error!("refusing to tear down a poisoned event loop");
                    return Err(TeardownError::Poisoned);
                }
                other => {
                    *state = other;
                    debug!("teardown requested with no event loop running");
                    return Err(TeardownError::NotRunning);
                }
            }
        };

        info!("stopping event loop");

        self.shutdown.store(true, Ordering::Release);
        self.wake();

        let joined = handle.join();

        let mut state = self.state.lock();

        let (timers, sockets) = match joined {
            Ok(Some(parts)) => parts,
            Ok(None) => {
                *state = State::Poisoned;
                error!("event loop thread exited without its collaborators");
                return Err(TeardownError::Join(String::from(
                    "loop thread exited without its collaborators",
                )));
            }
            Err(payload) => {
                *state = State::Poisoned;
                let reason = panic_message(payload.as_ref());
                error!(%reason, "unable to join event loop thread");
                return Err(TeardownError::Join(reason));
            }
        };

        self.shutdown.store(false, Ordering::Release);

        // Parked before shutting down, so the loop stays restartable even if
        // a collaborator panics here.
        *state = State::Idle { timers, sockets };
        let State::Idle { timers, sockets } = &mut *state else {
            return Err(TeardownError::NotRunning);
        };

        let result = match sockets.shutdown() {
            Err(e) => {
                error!(error = %e, "unable to tear down readiness source");
                Err(TeardownError::Sockets(e))
            }
            Ok(()) => timers.shutdown().map_err(|e| {
                error!(error = %e, "unable to tear down timer source");
                TeardownError::Timers(e)
            }),
        };

        if result.is_ok() {
            info!("event loop stopped");
        }

        result
    }

    /// Interrupts a blocked readiness wait.
    ///
    /// Safe to call from any thread at any time. Without a running loop this
    /// does nothing. Never fails.
    pub fn wake(&self) {
        match &*self.state.lock() {
            State::Running { waker, .. } | State::Stopping { waker } => {
                trace!("waking event loop");
                waker.wake();
            }
            _ => debug!("wake requested with no event loop running"),
        }
    }

    /// Returns `true` between a successful `init` and the matching `teardown`.
    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), State::Running { .. })
    }

    /// Returns `true` while a stop has been requested but not completed.
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

impl<T: TimerSource, R: ReadinessSource> Drop for EventLoop<T, R> {
    fn drop(&mut self) {
        if !self.is_running() {
            return;
        }

        if let Err(e) = self.teardown() {
            error!(error = &e as &dyn Error, "event loop teardown on drop failed");

            // The thread is detached from here on; make sure it still stops.
            self.shutdown.store(true, Ordering::Release);
        }
    }
}
