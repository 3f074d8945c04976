//! Small helpers shared by the loop core and the reference collaborators.

mod panic;
mod time;

pub(crate) use panic::panic_message;
pub(crate) use time::deadline_after;
