/// Identifies a socket registration.
///
/// Tokens are handed out by [`SocketHandle::register`](super::SocketHandle::register)
/// and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(pub(crate) u64);

/// Readiness a registration is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interest {
    pub read: bool,
    pub write: bool,
}

impl Interest {
    pub const READABLE: Interest = Interest {
        read: true,
        write: false,
    };

    pub const WRITABLE: Interest = Interest {
        read: false,
        write: true,
    };

    pub const BOTH: Interest = Interest {
        read: true,
        write: true,
    };
}

/// An I/O event reported by the poller.
///
/// Handed to the registration's handler on the loop thread. Errors and
/// hang-ups are reported as readable so the handler observes them on its
/// next read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub token: Token,
    pub readable: bool,
    pub writable: bool,
}
