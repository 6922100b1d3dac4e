//! Provider capacity tracking and assignment.
//!
//! ```text
//! assign(department, tier)
//!     │
//!     ├─ regular providers with capacity ── Available before OnCall, lowest load
//!     │
//!     ├─ backup providers with capacity ─── lowest load, non-fatal alert
//!     │
//!     └─ none ──────────────────────────── CapacityExhausted (operator intervention)
//! ```
//!
//! The ledger increment is the serialization point: selection and increment
//! happen under one lock, so two concurrent requests can never both take the
//! last unit of a provider.

mod ledger;
mod planner;

pub use ledger::*;
pub use planner::*;
