//! Sweep executor — the per-tick scan-and-fire procedure.
//! Invoked by an external cron through the gateway; stateless between
//! invocations (every durable fact lives in the store).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use morodas_core::Result;

use crate::dispatch::WorkflowDispatcher;
use crate::recurrence::next_fire_at;
use crate::store::{DueTrigger, NewRun, RunStatus, TriggerStore};

/// Per-trigger outcome inside one sweep.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerOutcome {
    pub trigger_id: String,
    pub trigger_name: String,
    pub agent_id: String,
    pub agent_name: String,
    /// Empty when no completed run was committed for this trigger.
    pub run_id: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Fired,
    Error,
}

/// Aggregate result of one sweep invocation.
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    /// Due triggers found by the store query.
    pub checked: usize,
    /// Triggers fired and rescheduled.
    pub fired: usize,
    /// Due triggers whose owning agent is disabled.
    pub skipped: usize,
    pub results: Vec<TriggerOutcome>,
}

/// Scans for due triggers and fires them.
pub struct SweepExecutor {
    store: Arc<dyn TriggerStore>,
    dispatcher: Option<WorkflowDispatcher>,
}

impl SweepExecutor {
    pub fn new(store: Arc<dyn TriggerStore>) -> Self {
        Self { store, dispatcher: None }
    }

    /// Attach a workflow dispatcher; fired triggers are forwarded to it
    /// before being recorded.
    pub fn with_dispatcher(mut self, dispatcher: WorkflowDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// One sweep pass over every due trigger.
    ///
    /// A failing trigger never aborts the rest — it gets a `failed` run
    /// record and an `error` entry in the summary. Only a failing initial
    /// due-trigger query fails the whole invocation (nothing was touched,
    /// so the next tick retries naturally).
    ///
    /// Due triggers of disabled agents are counted `skipped` and left due:
    /// they fire on the first sweep after the agent is re-enabled.
    pub async fn run_sweep(&self, now: DateTime<Utc>) -> Result<SweepSummary> {
        let due = self.store.due_triggers(now)?;
        let mut summary = SweepSummary {
            checked: due.len(),
            fired: 0,
            skipped: 0,
            results: Vec::with_capacity(due.len()),
        };

        for item in due {
            if !item.agent_enabled {
                tracing::debug!(
                    "⏭️ Trigger '{}' skipped: agent '{}' is disabled",
                    item.trigger.name,
                    item.agent_name
                );
                summary.skipped += 1;
                continue;
            }

            match self.fire_one(&item, now).await {
                Ok(run_id) => {
                    tracing::info!(
                        "🔔 Trigger fired: '{}' (agent '{}')",
                        item.trigger.name,
                        item.agent_name
                    );
                    summary.fired += 1;
                    summary.results.push(TriggerOutcome {
                        trigger_id: item.trigger.id.clone(),
                        trigger_name: item.trigger.name.clone(),
                        agent_id: item.agent_id.clone(),
                        agent_name: item.agent_name.clone(),
                        run_id,
                        status: OutcomeStatus::Fired,
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::warn!("⚠️ Trigger '{}' failed: {e}", item.trigger.name);
                    let failure = NewRun {
                        agent_id: item.agent_id.clone(),
                        status: RunStatus::Failed,
                        output: firing_payload(&item, now),
                        error: Some(e.to_string()),
                        duration_ms: None,
                    };
                    if let Err(record_err) = self.store.append_run(&failure) {
                        tracing::error!(
                            "Could not record failure for trigger '{}': {record_err}",
                            item.trigger.name
                        );
                    }
                    summary.results.push(TriggerOutcome {
                        trigger_id: item.trigger.id.clone(),
                        trigger_name: item.trigger.name.clone(),
                        agent_id: item.agent_id.clone(),
                        agent_name: item.agent_name.clone(),
                        run_id: String::new(),
                        status: OutcomeStatus::Error,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        Ok(summary)
    }

    /// Fire a single due trigger: dispatch to the workflow server when one
    /// is configured, then commit run record + reschedule + agent stamp as
    /// one transaction.
    async fn fire_one(&self, item: &DueTrigger, now: DateTime<Utc>) -> Result<String> {
        let started = std::time::Instant::now();
        let mut output = firing_payload(item, now);

        if let Some(dispatcher) = &self.dispatcher {
            output["workflow"] = dispatcher.dispatch(item, now).await?;
        }

        let run = NewRun {
            agent_id: item.agent_id.clone(),
            status: RunStatus::Completed,
            output,
            error: None,
            duration_ms: Some(started.elapsed().as_millis() as i64),
        };
        let next = next_fire_at(&item.trigger.schedule, now);
        self.store.record_fire(&item.trigger.id, &run, now, next)
    }
}

fn firing_payload(item: &DueTrigger, now: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "trigger_id": item.trigger.id,
        "trigger_name": item.trigger.name,
        "fired_at": now.to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::{Frequency, Schedule, Trigger};
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// In-memory store fake. `record_fire` succeeds unless the trigger id
    /// is listed in `fail_ids`.
    #[derive(Default)]
    struct FakeStore {
        due: Vec<DueTrigger>,
        fail_ids: Vec<String>,
        runs: Mutex<Vec<NewRun>>,
        fires: Mutex<Vec<(String, DateTime<Utc>, DateTime<Utc>)>>,
    }

    impl TriggerStore for FakeStore {
        fn due_triggers(&self, _now: DateTime<Utc>) -> Result<Vec<DueTrigger>> {
            Ok(self.due.clone())
        }

        fn append_run(&self, run: &NewRun) -> Result<String> {
            self.runs.lock().unwrap().push(run.clone());
            Ok(format!("run-{}", self.runs.lock().unwrap().len()))
        }

        fn record_fire(
            &self,
            trigger_id: &str,
            run: &NewRun,
            last_fired_at: DateTime<Utc>,
            next_fire_at: DateTime<Utc>,
        ) -> Result<String> {
            if self.fail_ids.iter().any(|id| id == trigger_id) {
                return Err(morodas_core::MorodasError::Storage("disk full".into()));
            }
            self.runs.lock().unwrap().push(run.clone());
            self.fires
                .lock()
                .unwrap()
                .push((trigger_id.to_string(), last_fired_at, next_fire_at));
            Ok(format!("run-{}", self.runs.lock().unwrap().len()))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 11, 1, 0, 0).unwrap()
    }

    fn due_item(id: &str, agent_enabled: bool) -> DueTrigger {
        let schedule = Schedule {
            frequency: Frequency::Daily,
            day_of_week: None,
            day_of_month: None,
            hour: 9,
            minute: 0,
        };
        // created in the past so the trigger is due at `now()`
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let mut trigger = Trigger::new(&format!("agent-{id}"), &format!("trigger-{id}"), schedule, true, created);
        trigger.id = id.to_string();
        DueTrigger {
            trigger,
            agent_id: format!("agent-{id}"),
            agent_name: format!("Agent {id}"),
            agent_enabled,
        }
    }

    #[tokio::test]
    async fn test_sweep_fires_due_and_skips_disabled_agents() {
        let store = Arc::new(FakeStore {
            due: vec![due_item("a", true), due_item("b", true), due_item("c", false)],
            ..Default::default()
        });
        let summary = SweepExecutor::new(store.clone()).run_sweep(now()).await.unwrap();

        assert_eq!(summary.checked, 3);
        assert_eq!(summary.fired, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.results.len(), 2);
        // exactly one run record per fired trigger, none for the skipped one
        assert_eq!(store.runs.lock().unwrap().len(), 2);
        // the skipped trigger was not rescheduled
        assert!(!store.fires.lock().unwrap().iter().any(|(id, _, _)| id == "c"));
    }

    #[tokio::test]
    async fn test_fired_triggers_advance_past_now() {
        let store = Arc::new(FakeStore { due: vec![due_item("a", true)], ..Default::default() });
        SweepExecutor::new(store.clone()).run_sweep(now()).await.unwrap();

        let fires = store.fires.lock().unwrap();
        assert_eq!(fires.len(), 1);
        let (_, last_fired, next) = &fires[0];
        assert_eq!(*last_fired, now());
        assert!(*next > now());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_the_rest() {
        let store = Arc::new(FakeStore {
            due: vec![due_item("bad", true), due_item("ok", true)],
            fail_ids: vec!["bad".into()],
            ..Default::default()
        });
        let summary = SweepExecutor::new(store.clone()).run_sweep(now()).await.unwrap();

        assert_eq!(summary.fired, 1);
        let errored: Vec<_> = summary
            .results
            .iter()
            .filter(|r| r.status == OutcomeStatus::Error)
            .collect();
        assert_eq!(errored.len(), 1);
        assert_eq!(errored[0].trigger_id, "bad");
        assert!(errored[0].run_id.is_empty());

        // the failed trigger still got its (failed) run record
        let runs = store.runs.lock().unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().any(|r| r.status == RunStatus::Failed && r.error.is_some()));
    }

    #[tokio::test]
    async fn test_empty_sweep() {
        let store = Arc::new(FakeStore::default());
        let summary = SweepExecutor::new(store).run_sweep(now()).await.unwrap();
        assert_eq!(summary.checked, 0);
        assert_eq!(summary.fired, 0);
        assert!(summary.results.is_empty());
    }
}
