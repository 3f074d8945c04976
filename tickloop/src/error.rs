//! Lifecycle errors.
//!
//! Starting and stopping the loop are the only fallible operations exposed by
//! the core. Errors raised by collaborators during a tick never reach this
//! module; they are logged and contained on the loop thread.
//!
//! Messages describe the failing step only. The collaborator's own error is
//! available through [`std::error::Error::source`].

use std::io;

/// Failure to start an [`EventLoop`](crate::EventLoop).
///
/// Initialization is not rolled back: a collaborator that initialized before
/// the failing step stays initialized.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// The timer collaborator refused to initialize.
    #[error("failed to initialize timer source")]
    Timers(#[source] io::Error),

    /// The socket collaborator refused to initialize.
    #[error("failed to initialize readiness source")]
    Sockets(#[source] io::Error),

    /// The loop thread could not be created.
    #[error("failed to spawn event loop thread")]
    Spawn(#[source] io::Error),

    /// The loop is already running or is being torn down.
    #[error("event loop is already running")]
    AlreadyRunning,

    /// A previous teardown failed to join the loop thread.
    #[error("event loop was poisoned by a failed teardown")]
    Poisoned,
}

/// Failure to stop an [`EventLoop`](crate::EventLoop).
///
/// Teardown stops at the failing step and is never retried.
#[derive(Debug, thiserror::Error)]
pub enum TeardownError {
    /// There is no loop thread to stop.
    #[error("event loop is not running")]
    NotRunning,

    /// Teardown was requested from the loop thread itself.
    #[error("event loop cannot be torn down from its own thread")]
    FromLoopThread,

    /// A previous teardown failed to join the loop thread.
    #[error("event loop was poisoned by a failed teardown")]
    Poisoned,

    /// The loop thread terminated abnormally.
    #[error("failed to join event loop thread: {0}")]
    Join(String),

    /// The socket collaborator failed to shut down.
    #[error("failed to shut down readiness source")]
    Sockets(#[source] io::Error),

    /// The timer collaborator failed to shut down.
    #[error("failed to shut down timer source")]
    Timers(#[source] io::Error),
}
