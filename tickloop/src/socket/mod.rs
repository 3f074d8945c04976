//! Reference socket collaborator (Linux).
//!
//! [`PollSockets`] implements [`ReadinessSource`](crate::ReadinessSource) on
//! top of `epoll`, with an `eventfd` as the wake signal. Producers register
//! sockets and their handlers through a [`SocketHandle`]; handlers run on the
//! loop thread whenever their socket is ready.

mod command;
mod event;
mod handle;
mod poller;
mod sockets;

pub use event::{Event, Interest, Token};
pub use handle::SocketHandle;
pub use poller::SocketWaker;
pub use sockets::PollSockets;
