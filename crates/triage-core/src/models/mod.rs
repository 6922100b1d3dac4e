//! Domain models for the triage system.

mod intake;
mod provider;
mod queue;
mod slot;
mod triage;

pub use intake::*;
pub use provider::*;
pub use queue::*;
pub use slot::*;
pub use triage::*;
