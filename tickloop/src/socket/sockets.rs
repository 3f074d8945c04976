use super::command::{Command, Handler};
use super::event::{Event, Token};
use super::handle::SocketHandle;
use super::poller::{EpollPoller, SocketWaker};
use crate::source::{ReadinessSource, WakeReason};
use crate::utils::panic_message;

use std::collections::HashMap;
use std::io;
use std::os::fd::RawFd;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, channel};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

struct Registration {
    fd: RawFd,
    handler: Handler,
}

/// The reference socket collaborator.
///
/// An `epoll`-backed readiness source. Sockets are registered through a
/// [`SocketHandle`] together with a handler that services them on the loop
/// thread.
///
/// A registration whose handler panics is dropped; the rest of the sockets
/// keep being serviced.
pub struct PollSockets {
    poller: EpollPoller,

    /// Registration changes queued by handles.
    receiver: Receiver<Command>,

    /// Kept so the channel stays open and new handles can be cloned off it.
    handle: SocketHandle,

    registrations: HashMap<Token, Registration>,

    /// Events collected by the last poll.
    events: Vec<Event>,
}

impl PollSockets {
    /// Creates the epoll instance and its wake eventfd.
    pub fn new() -> io::Result<Self> {
        let poller = EpollPoller::new()?;
        let (sender, receiver) = channel();
        let handle = SocketHandle::new(sender, SocketWaker(poller.eventfd()));

        Ok(Self {
            poller,
            receiver,
            handle,
            registrations: HashMap::new(),
            events: Vec::new(),
        })
    }

    /// Returns a handle for registering sockets with this poller.
    pub fn handle(&self) -> SocketHandle {
        self.handle.clone()
    }

    /// Number of sockets currently registered with the poller.
    pub fn registered(&self) -> usize {
        self.registrations.len()
    }

    /// Applies queued registration changes.
    fn apply_commands(&mut self) {
        while let Ok(command) = self.receiver.try_recv() {
            match command {
                Command::Register {
                    token,
                    fd,
                    interest,
                    handler,
                } => match self.poller.register(fd, token, interest) {
                    Ok(()) => {
                        debug!(?token, fd, "socket registered");
                        self.registrations
                            .insert(token, Registration { fd, handler });
                    }
                    Err(e) => warn!(?token, fd, error = %e, "unable to register socket"),
                },
                Command::Reregister { token, interest } => {
                    let Some(registration) = self.registrations.get(&token) else {
                        debug!(?token, "reregister for unknown socket ignored");
                        continue;
                    };

                    if let Err(e) = self.poller.reregister(registration.fd, token, interest) {
                        warn!(?token, error = %e, "unable to change socket interest");
                    }
                }
                Command::Deregister { token } => self.remove(token),
            }
        }
    }

    fn remove(&mut self, token: Token) {
        let Some(registration) = self.registrations.remove(&token) else {
            return;
        };

        // The descriptor may already be closed, which removes it from epoll.
        if let Err(e) = self.poller.deregister(registration.fd) {
            debug!(?token, error = %e, "socket already gone from poller");
        }

        debug!(?token, "socket deregistered");
    }

    /// Runs the handler of every ready socket. Returns how many ran.
    fn dispatch(&mut self) -> usize {
        let mut ready = 0;
        let mut broken = Vec::new();

        for event in self.events.drain(..) {
            // Deregistered since the poll.
            let Some(registration) = self.registrations.get_mut(&event.token) else {
                continue;
            };

            ready += 1;

            let handler = &mut registration.handler;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                error!(
                    token = ?event.token,
                    reason = %panic_message(payload.as_ref()),
                    "socket handler panicked; dropping socket"
                );
                broken.push(event.token);
            }
        }

        for token in broken {
            self.remove(token);
        }

        ready
    }
}

impl ReadinessSource for PollSockets {
    type Waker = SocketWaker;

    /// Clears wakes left over from a previous run.
    fn initialize(&mut self) -> io::Result<()> {
        self.poller.eventfd().drain();

        debug!(registered = self.registrations.len(), "socket poller ready");
        Ok(())
    }

    fn waker(&self) -> SocketWaker {
        SocketWaker(self.poller.eventfd())
    }

    fn wait(&mut self, deadline: Option<Instant>) -> io::Result<WakeReason> {
        self.apply_commands();

        let timeout = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        let woken = self.poller.poll(&mut self.events, timeout)?;

        let ready = self.dispatch();
        trace!(ready, woken, "socket poll complete");

        Ok(if ready > 0 {
            WakeReason::Ready(ready)
        } else if woken {
            WakeReason::Woken
        } else {
            WakeReason::Timeout
        })
    }

    /// Drops every registration, including ones still queued.
    fn shutdown(&mut self) -> io::Result<()> {
        while self.receiver.try_recv().is_ok() {}

        let released = self.registrations.len();
        let tokens: Vec<Token> = self.registrations.keys().copied().collect();
        for token in tokens {
            self.remove(token);
        }

        info!(released, "socket poller shut down");
        Ok(())
    }
}
