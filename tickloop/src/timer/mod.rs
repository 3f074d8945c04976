//! Reference timer collaborator.
//!
//! [`TimerQueue`] implements [`TimerSource`](crate::TimerSource) with a
//! deadline-ordered heap of one-shot callbacks. Producers on any thread
//! schedule work through a [`TimerHandle`] and may cancel it through the
//! returned [`Timer`].

mod entry;
mod handle;
mod queue;

pub use handle::{Timer, TimerHandle};
pub use queue::TimerQueue;
