//! Slot planning and booking conflict resolution.

mod conflict;
mod slots;

pub use conflict::*;
pub use slots::*;
