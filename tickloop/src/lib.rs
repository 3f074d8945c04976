//! # tickloop
//!
//! **tickloop** runs all time-driven and network-driven work of a library on
//! one dedicated background thread, so the host application never has to
//! drive a loop itself.
//!
//! Each iteration of the loop (a *tick*) does two things, in order:
//!
//! - asks a [`TimerSource`] to fire every due timer and report the next
//!   deadline,
//! - blocks on a [`ReadinessSource`] until a socket is ready, a wake
//!   arrives, or that deadline passes.
//!
//! Timer latency is therefore bounded by the socket wait granularity, never
//! by arbitrary I/O wait time. Any thread can cut a wait short with
//! [`EventLoop::wake`], and [`EventLoop::teardown`] stops the thread cleanly
//! so the loop can be started again.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use tickloop::DefaultLoop;
//!
//! let default = DefaultLoop::new()?;
//! default.event_loop().init()?;
//!
//! default.schedule(Duration::from_millis(100), || {
//!     println!("runs on the loop thread");
//! });
//!
//! default.event_loop().teardown()?;
//! ```
//!
//! ## Modules
//!
//! - [`timer`] — Reference timer queue
//! - `socket` — Reference `epoll` readiness source (Linux)
//! - [`error`] — Lifecycle errors
//! - [`trace`] — Logging setup

mod event_loop;
mod source;
mod utils;

pub mod error;
pub mod timer;
pub mod trace;

#[cfg(target_os = "linux")]
pub mod socket;

#[cfg(target_os = "linux")]
mod global;

pub use error::{InitError, TeardownError};
pub use event_loop::{EventLoop, EventLoopBuilder, Tickler};
pub use source::{ReadinessSource, TimerSource, Wake, WakeReason};

#[cfg(target_os = "linux")]
pub use global::{
    DefaultLoop, default_loop, event_loop_init, event_loop_teardown, event_loop_try_teardown,
    event_loop_wake,
};

pub use tickloop_macros::test;
