//! Hotel Gateway Scheduler
//!
//! The timer tier: one periodic tick loop per message kind, each tick
//! firing a `TriggerFetch` RPC at the dispatcher. Ticks are
//! fire-and-forget; a failed trigger is logged and the next tick is the
//! retry.

pub mod scheduler;

pub use scheduler::{DispatcherClient, Scheduler, TriggerOutcome};
