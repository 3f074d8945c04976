use super::command::Command;
use super::event::{Event, Interest, Token};
use super::poller::SocketWaker;
use crate::source::Wake;

use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use tracing::debug;

/// A cloneable handle used to manage socket registrations from any thread.
///
/// Every change is queued for the loop thread and wakes the poller so it is
/// applied without waiting out the current deadline.
#[derive(Clone)]
pub struct SocketHandle {
    sender: Sender<Command>,
    waker: SocketWaker,
    next_token: Arc<AtomicU64>,
}

impl SocketHandle {
    pub(crate) fn new(sender: Sender<Command>, waker: SocketWaker) -> Self {
        Self {
            sender,
            waker,
            next_token: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Registers a socket for readiness notifications.
    ///
    /// `handler` runs on the loop thread each time the socket is ready for
    /// `interest`. Readiness is level-triggered: a handler that leaves data
    /// unread is called again on the next tick.
    ///
    /// The caller keeps ownership of the socket and must
    /// [`deregister`](Self::deregister) it before closing it.
    pub fn register<S, F>(&self, source: &S, interest: Interest, handler: F) -> Token
    where
        S: AsRawFd + ?Sized,
        F: FnMut(Event) + Send + 'static,
    {
        let token = Token(self.next_token.fetch_add(1, Ordering::Relaxed));

        self.send(Command::Register {
            token,
            fd: source.as_raw_fd(),
            interest,
            handler: Box::new(handler),
        });

        token
    }

    /// Changes the readiness a registration is interested in.
    pub fn reregister(&self, token: Token, interest: Interest) {
        self.send(Command::Reregister { token, interest });
    }

    /// Removes a registration and drops its handler.
    pub fn deregister(&self, token: Token) {
        self.send(Command::Deregister { token });
    }

    fn send(&self, command: Command) {
        if self.sender.send(command).is_err() {
            debug!("socket poller is gone; command discarded");
            return;
        }

        self.waker.wake();
    }
}
