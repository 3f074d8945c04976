use super::event::{Event, Interest, Token};

use std::os::fd::RawFd;

/// Readiness callback run on the loop thread.
pub(crate) type Handler = Box<dyn FnMut(Event) + Send + 'static>;

/// Registration changes sent from producers to the poller.
///
/// Commands are applied at the start of the next wait, on the loop thread.
pub(crate) enum Command {
    Register {
        token: Token,
        fd: RawFd,
        interest: Interest,
        handler: Handler,
    },
    Reregister {
        token: Token,
        interest: Interest,
    },
    Deregister {
        token: Token,
    },
}
