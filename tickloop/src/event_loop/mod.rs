//! The event loop core.
//!
//! This module contains the lifecycle manager ([`EventLoop`]), its builder,
//! and the per-iteration [`Tickler`].
//!
//! The loop thread runs `while !shutdown { tick() }`, where a tick fires due
//! timers and then waits on socket readiness for no longer than the next
//! timer deadline. Every other thread talks to it through `init`,
//! `teardown` and `wake`.

mod builder;
mod core;
mod tickler;

pub use builder::EventLoopBuilder;
pub use self::core::EventLoop;
pub use tickler::Tickler;
