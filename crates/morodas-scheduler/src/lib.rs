//! # MORODAS Scheduler
//!
//! The trigger scheduling engine: recurrence math, schedule preview, and the
//! due-trigger sweep. All civil-time arithmetic runs in a constant UTC+09:00
//! offset (no DST) so results are reproducible regardless of host zone.
//!
//! ## Architecture
//! ```text
//! external cron (once/minute)
//!   └── POST /api/v1/sweep → SweepExecutor::run_sweep(now)
//!         ├── TriggerStore::due_triggers(now)        enabled AND next_fire_at <= now
//!         ├── agent disabled? → skipped (left due)
//!         └── per trigger, isolated:
//!               ├── WorkflowDispatcher (optional HTTP forward)
//!               ├── next_fire_at(schedule, now)       pure recurrence math
//!               └── TriggerStore::record_fire         run + trigger + agent, one tx
//!
//! dashboard UI
//!   └── upcoming(schedule, n) → preview of the next n fire instants
//! ```
//!
//! The executor is stateless between invocations; every durable fact lives
//! behind the [`store::TriggerStore`] trait.

pub mod dispatch;
pub mod preview;
pub mod recurrence;
pub mod store;
pub mod sweep;
pub mod trigger;

pub use dispatch::WorkflowDispatcher;
pub use preview::upcoming;
pub use recurrence::next_fire_at;
pub use store::{DueTrigger, NewRun, RunStatus, TriggerStore};
pub use sweep::{OutcomeStatus, SweepExecutor, SweepSummary, TriggerOutcome};
pub use trigger::{Frequency, Schedule, SchedulePatch, Trigger, TriggerPatch};
