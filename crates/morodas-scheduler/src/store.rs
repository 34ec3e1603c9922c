//! Store adapter contract — what the sweep needs from the durable store.
//! The concrete SQLite implementation lives in `morodas-db`; tests use
//! in-memory fakes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use morodas_core::Result;

use crate::trigger::Trigger;

/// A due trigger joined with the owning agent's identity and enabled flag.
#[derive(Debug, Clone)]
pub struct DueTrigger {
    pub trigger: Trigger,
    pub agent_id: String,
    pub agent_name: String,
    pub agent_enabled: bool,
}

/// Outcome status of a run record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// A run record to append to the audit trail.
#[derive(Debug, Clone)]
pub struct NewRun {
    pub agent_id: String,
    pub status: RunStatus,
    pub output: serde_json::Value,
    pub error: Option<String>,
    pub duration_ms: Option<i64>,
}

/// Durable trigger/agent/run storage as seen by the sweep.
pub trait TriggerStore: Send + Sync {
    /// All enabled triggers with `next_fire_at <= now`, joined with the
    /// owning agent. Triggers of disabled agents are included — deciding
    /// what to do with them is the sweep's call, not the store's.
    fn due_triggers(&self, now: DateTime<Utc>) -> Result<Vec<DueTrigger>>;

    /// Append a standalone run record. Used for failure bookkeeping.
    fn append_run(&self, run: &NewRun) -> Result<String>;

    /// Commit one firing atomically: insert the run record, stamp the
    /// trigger (`last_fired_at` + new `next_fire_at`) and the owning
    /// agent (`last_run_at`). All three writes land in one transaction or
    /// none do. Returns the new run id.
    fn record_fire(
        &self,
        trigger_id: &str,
        run: &NewRun,
        last_fired_at: DateTime<Utc>,
        next_fire_at: DateTime<Utc>,
    ) -> Result<String>;
}
