//! Linux `epoll` backend.
//!
//! The poller owns an `epoll` instance and an `eventfd` registered under a
//! reserved token. Writing to the eventfd from any thread makes a blocked
//! `epoll_wait` return immediately. The eventfd counter latches the signal,
//! so a wake sent while nobody is waiting ends the next wait instead.

use super::event::{Event, Interest, Token};
use crate::source::Wake;

use libc::{
    EFD_CLOEXEC, EFD_NONBLOCK, EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD,
    EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLOUT, c_int, epoll_create1, epoll_ctl, epoll_event,
    epoll_wait, eventfd,
};
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::Arc;
use std::time::Duration;

/// Reserved token used internally for the wake-up event.
///
/// Registration tokens count up from zero and never reach it.
const WAKE_TOKEN: u64 = u64::MAX;

/// Maximum number of events collected by one `epoll_wait`.
const EVENT_CAPACITY: usize = 64;

/// A non-blocking `eventfd` used as a wake-up signal.
pub(crate) struct EventFd(OwnedFd);

impl EventFd {
    fn new() -> io::Result<Self> {
        let fd = unsafe { eventfd(0, EFD_NONBLOCK | EFD_CLOEXEC) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self(unsafe { OwnedFd::from_raw_fd(fd) }))
    }

    /// Increments the counter, making the eventfd readable.
    ///
    /// A saturated counter fails with `EAGAIN`, which still leaves the
    /// eventfd readable, so the result is ignored.
    pub(crate) fn signal(&self) {
        let buf: u64 = 1;
        unsafe {
            libc::write(self.0.as_raw_fd(), &buf as *const u64 as *const _, 8);
        }
    }

    /// Resets the counter to zero.
    pub(crate) fn drain(&self) {
        let mut buf: u64 = 0;
        unsafe {
            libc::read(self.0.as_raw_fd(), &mut buf as *mut u64 as *mut _, 8);
        }
    }
}

/// Interrupts a blocked [`PollSockets`](super::PollSockets) wait.
///
/// Cheap to clone, safe to use from any thread.
#[derive(Clone)]
pub struct SocketWaker(pub(crate) Arc<EventFd>);

impl Wake for SocketWaker {
    fn wake(&self) {
        self.0.signal();
    }
}

/// Linux `epoll` poller.
pub(crate) struct EpollPoller {
    epoll: OwnedFd,

    /// Reusable buffer for `epoll_wait`.
    events: Vec<epoll_event>,

    eventfd: Arc<EventFd>,
}

impl EpollPoller {
    /// Creates the epoll instance and registers the wake eventfd into it.
    pub(crate) fn new() -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        let poller = Self {
            epoll: unsafe { OwnedFd::from_raw_fd(epoll) },
            events: vec![epoll_event { events: 0, u64: 0 }; EVENT_CAPACITY],
            eventfd: Arc::new(EventFd::new()?),
        };

        poller.ctl(
            EPOLL_CTL_ADD,
            poller.eventfd.0.as_raw_fd(),
            Some(epoll_event {
                events: EPOLLIN as u32,
                u64: WAKE_TOKEN,
            }),
        )?;

        Ok(poller)
    }

    pub(crate) fn eventfd(&self) -> Arc<EventFd> {
        self.eventfd.clone()
    }

    pub(crate) fn register(&self, fd: RawFd, token: Token, interest: Interest) -> io::Result<()> {
        self.ctl(EPOLL_CTL_ADD, fd, Some(event_for(token, interest)))
    }

    /// Updates interest flags for an already registered descriptor.
    pub(crate) fn reregister(&self, fd: RawFd, token: Token, interest: Interest) -> io::Result<()> {
        self.ctl(EPOLL_CTL_MOD, fd, Some(event_for(token, interest)))
    }

    pub(crate) fn deregister(&self, fd: RawFd) -> io::Result<()> {
        self.ctl(EPOLL_CTL_DEL, fd, None)
    }

    fn ctl(&self, op: c_int, fd: RawFd, event: Option<epoll_event>) -> io::Result<()> {
        let rc = match event {
            Some(mut event) => unsafe { epoll_ctl(self.epoll.as_raw_fd(), op, fd, &mut event) },
            None => unsafe { epoll_ctl(self.epoll.as_raw_fd(), op, fd, std::ptr::null_mut()) },
        };

        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    /// Polls for I/O readiness.
    ///
    /// Blocks until a descriptor is ready, the wake eventfd is signalled, or
    /// `timeout` expires (`None` blocks indefinitely). Ready descriptors are
    /// appended to `events`.
    ///
    /// Returns `true` when the wait was cut short by a wake or a signal.
    pub(crate) fn poll(
        &mut self,
        events: &mut Vec<Event>,
        timeout: Option<Duration>,
    ) -> io::Result<bool> {
        let n = unsafe {
            epoll_wait(
                self.epoll.as_raw_fd(),
                self.events.as_mut_ptr(),
                self.events.len() as c_int,
                timeout_ms(timeout),
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(true);
            }
            return Err(err);
        }

        let mut woken = false;

        for ev in &self.events[..n as usize] {
            let data = ev.u64;
            let flags = ev.events;

            if data == WAKE_TOKEN {
                self.eventfd.drain();
                woken = true;
                continue;
            }

            events.push(Event {
                token: Token(data),
                readable: flags & ((EPOLLIN | EPOLLERR | EPOLLHUP) as u32) != 0,
                writable: flags & (EPOLLOUT as u32) != 0,
            });
        }

        Ok(woken)
    }
}

fn event_for(token: Token, interest: Interest) -> epoll_event {
    let mut flags = 0;

    if interest.read {
        flags |= EPOLLIN;
    }
    if interest.write {
        flags |= EPOLLOUT;
    }

    epoll_event {
        events: flags as u32,
        u64: token.0,
    }
}

/// Converts a timeout to whole milliseconds for `epoll_wait`.
///
/// Rounds up so the wait never ends before the deadline.
fn timeout_ms(timeout: Option<Duration>) -> c_int {
    match timeout {
        None => -1,
        Some(timeout) => timeout
            .as_nanos()
            .div_ceil(1_000_000)
            .min(c_int::MAX as u128) as c_int,
    }
}
