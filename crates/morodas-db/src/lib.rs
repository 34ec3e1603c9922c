//! # MORODAS Store
//!
//! SQLite-backed persistence for agents, triggers, and run records.
//! One database file, WAL mode, RFC3339 TEXT timestamps. Implements the
//! scheduler's [`TriggerStore`] contract, including the per-firing
//! transaction (run record + trigger reschedule + agent stamp commit
//! together or not at all).

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use morodas_core::{MorodasError, Result};
use morodas_scheduler::store::{DueTrigger, NewRun, TriggerStore};
use morodas_scheduler::trigger::{Frequency, Schedule, Trigger, TriggerPatch};

/// Agent record — an automation unit owning zero or more triggers.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub agent_type: String,
    pub enabled: bool,
    /// Stamped only as a side effect of a trigger firing.
    pub last_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Partial update for an agent row.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct AgentPatch {
    pub name: Option<String>,
    pub agent_type: Option<String>,
    pub enabled: Option<bool>,
}

/// Immutable audit entry for one trigger firing attempt.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunRecord {
    pub id: String,
    pub agent_id: String,
    pub status: String,
    pub output: serde_json::Value,
    pub error: Option<String>,
    pub duration_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// MORODAS database — all dashboard state lives here.
pub struct MorodasDb {
    conn: Mutex<Connection>,
}

const TRIGGER_SELECT: &str = "SELECT id, agent_id, name, frequency, day_of_week, day_of_month, \
     hour, minute, enabled, next_fire_at, last_fired_at, created_at FROM triggers";

fn row_to_trigger(row: &rusqlite::Row) -> rusqlite::Result<Trigger> {
    let frequency: String = row.get(3)?;
    Ok(Trigger {
        id: row.get(0)?,
        agent_id: row.get(1)?,
        name: row.get(2)?,
        schedule: Schedule {
            frequency: Frequency::parse(&frequency),
            day_of_week: row.get(4)?,
            day_of_month: row.get(5)?,
            hour: row.get(6)?,
            minute: row.get(7)?,
        },
        enabled: row.get::<_, i64>(8)? != 0,
        next_fire_at: parse_ts_opt(row.get(9)?),
        last_fired_at: parse_ts_opt(row.get(10)?),
        created_at: parse_ts(&row.get::<_, String>(11)?),
    })
}

fn row_to_agent(row: &rusqlite::Row) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: row.get(0)?,
        name: row.get(1)?,
        agent_type: row.get(2)?,
        enabled: row.get::<_, i64>(3)? != 0,
        last_run_at: parse_ts_opt(row.get(4)?),
        created_at: parse_ts(&row.get::<_, String>(5)?),
    })
}

fn parse_ts(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_ts_opt(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc))
}

fn storage(context: &str) -> impl Fn(rusqlite::Error) -> MorodasError + '_ {
    move |e| MorodasError::Storage(format!("{context}: {e}"))
}

impl MorodasDb {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(storage("DB open"))?;
        // WAL allows concurrent readers while the sweep writes
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        // FK enforcement is per-connection and off by default
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(storage("DB pragma"))?;
        let db = Self { conn: Mutex::new(conn) };
        db.migrate()?;
        tracing::debug!("💾 Database ready: {}", path.display());
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS agents (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                agent_type TEXT NOT NULL DEFAULT 'workflow',
                enabled INTEGER NOT NULL DEFAULT 1,
                last_run_at TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS triggers (
                id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                name TEXT NOT NULL,
                frequency TEXT NOT NULL DEFAULT 'daily',
                day_of_week INTEGER,
                day_of_month INTEGER,
                hour INTEGER NOT NULL DEFAULT 9,
                minute INTEGER NOT NULL DEFAULT 0,
                enabled INTEGER NOT NULL DEFAULT 1,
                next_fire_at TEXT,
                last_fired_at TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (agent_id) REFERENCES agents(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_triggers_due
                ON triggers (enabled, next_fire_at);

            -- audit trail: append-only, kept indefinitely, no FK so run
            -- history survives agent deletion
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                status TEXT NOT NULL,
                output TEXT NOT NULL DEFAULT '{}',
                error TEXT,
                duration_ms INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_runs_agent
                ON runs (agent_id, created_at);
            ",
        )
        .map_err(storage("Migration"))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| MorodasError::Storage(format!("Lock: {e}")))
    }

    // ─── Agents ──────────────────────────────────────────────

    pub fn create_agent(&self, name: &str, agent_type: &str, enabled: bool) -> Result<Agent> {
        let agent = Agent {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            agent_type: agent_type.to_string(),
            enabled,
            last_run_at: None,
            created_at: Utc::now(),
        };
        self.lock()?
            .execute(
                "INSERT INTO agents (id, name, agent_type, enabled, last_run_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
                params![agent.id, agent.name, agent.agent_type, agent.enabled as i64, agent.created_at.to_rfc3339()],
            )
            .map_err(storage("Create agent"))?;
        Ok(agent)
    }

    pub fn list_agents(&self) -> Result<Vec<Agent>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, name, agent_type, enabled, last_run_at, created_at FROM agents ORDER BY created_at")
            .map_err(storage("List agents"))?;
        let agents = stmt
            .query_map([], row_to_agent)
            .map_err(storage("List agents"))?
            .filter_map(|a| a.ok())
            .collect();
        Ok(agents)
    }

    pub fn get_agent(&self, id: &str) -> Result<Agent> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name, agent_type, enabled, last_run_at, created_at FROM agents WHERE id = ?1",
            [id],
            row_to_agent,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => MorodasError::NotFound(format!("agent {id}")),
            other => MorodasError::Storage(format!("Get agent: {other}")),
        })
    }

    pub fn update_agent(&self, id: &str, patch: &AgentPatch) -> Result<Agent> {
        let current = self.get_agent(id)?;
        let name = patch.name.clone().unwrap_or(current.name);
        let agent_type = patch.agent_type.clone().unwrap_or(current.agent_type);
        let enabled = patch.enabled.unwrap_or(current.enabled);
        self.lock()?
            .execute(
                "UPDATE agents SET name = ?1, agent_type = ?2, enabled = ?3 WHERE id = ?4",
                params![name, agent_type, enabled as i64, id],
            )
            .map_err(storage("Update agent"))?;
        self.get_agent(id)
    }

    /// Delete an agent. Its triggers cascade; run records stay.
    pub fn delete_agent(&self, id: &str) -> Result<bool> {
        let changed = self
            .lock()?
            .execute("DELETE FROM agents WHERE id = ?1", [id])
            .map_err(storage("Delete agent"))?;
        Ok(changed > 0)
    }

    // ─── Triggers ────────────────────────────────────────────

    /// Create a trigger with its initial computed fire time.
    pub fn create_trigger(
        &self,
        agent_id: &str,
        name: &str,
        schedule: Schedule,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> Result<Trigger> {
        // reject orphan triggers up front
        self.get_agent(agent_id)?;
        let trigger = Trigger::new(agent_id, name, schedule, enabled, now);
        self.save_trigger(&trigger)?;
        Ok(trigger)
    }

    fn save_trigger(&self, trigger: &Trigger) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO triggers
                 (id, agent_id, name, frequency, day_of_week, day_of_month, hour, minute,
                  enabled, next_fire_at, last_fired_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    trigger.id,
                    trigger.agent_id,
                    trigger.name,
                    trigger.schedule.frequency.as_str(),
                    trigger.schedule.day_of_week,
                    trigger.schedule.day_of_month,
                    trigger.schedule.hour,
                    trigger.schedule.minute,
                    trigger.enabled as i64,
                    trigger.next_fire_at.map(|t| t.to_rfc3339()),
                    trigger.last_fired_at.map(|t| t.to_rfc3339()),
                    trigger.created_at.to_rfc3339(),
                ],
            )
            .map_err(storage("Save trigger"))?;
        Ok(())
    }

    pub fn list_triggers(&self, agent_id: Option<&str>) -> Result<Vec<Trigger>> {
        let conn = self.lock()?;
        let (sql, bind): (String, Vec<&str>) = match agent_id {
            Some(id) => (format!("{TRIGGER_SELECT} WHERE agent_id = ?1 ORDER BY created_at"), vec![id]),
            None => (format!("{TRIGGER_SELECT} ORDER BY created_at"), vec![]),
        };
        let mut stmt = conn.prepare(&sql).map_err(storage("List triggers"))?;
        let triggers = stmt
            .query_map(rusqlite::params_from_iter(bind), row_to_trigger)
            .map_err(storage("List triggers"))?
            .filter_map(|t| t.ok())
            .collect();
        Ok(triggers)
    }

    pub fn get_trigger(&self, id: &str) -> Result<Trigger> {
        let conn = self.lock()?;
        conn.query_row(&format!("{TRIGGER_SELECT} WHERE id = ?1"), [id], row_to_trigger)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => MorodasError::NotFound(format!("trigger {id}")),
                other => MorodasError::Storage(format!("Get trigger: {other}")),
            })
    }

    /// Apply a partial update: merged schedule fields recompute
    /// `next_fire_at`, disabling clears it, re-enabling recomputes it.
    pub fn update_trigger(&self, id: &str, patch: &TriggerPatch, now: DateTime<Utc>) -> Result<Trigger> {
        let updated = self.get_trigger(id)?.apply(patch, now);
        self.save_trigger(&updated)?;
        Ok(updated)
    }

    pub fn delete_trigger(&self, id: &str) -> Result<bool> {
        let changed = self
            .lock()?
            .execute("DELETE FROM triggers WHERE id = ?1", [id])
            .map_err(storage("Delete trigger"))?;
        Ok(changed > 0)
    }

    // ─── Runs ────────────────────────────────────────────────

    pub fn list_runs(&self, agent_id: Option<&str>, limit: usize) -> Result<Vec<RunRecord>> {
        let conn = self.lock()?;
        let row_to_run = |row: &rusqlite::Row| -> rusqlite::Result<RunRecord> {
            let output: String = row.get(3)?;
            Ok(RunRecord {
                id: row.get(0)?,
                agent_id: row.get(1)?,
                status: row.get(2)?,
                output: serde_json::from_str(&output).unwrap_or_default(),
                error: row.get(4)?,
                duration_ms: row.get(5)?,
                created_at: parse_ts(&row.get::<_, String>(6)?),
            })
        };
        let runs = match agent_id {
            Some(id) => {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, agent_id, status, output, error, duration_ms, created_at FROM runs \
                         WHERE agent_id = ?1 ORDER BY created_at DESC LIMIT ?2",
                    )
                    .map_err(storage("List runs"))?;
                let rows = stmt
                    .query_map(params![id, limit as i64], row_to_run)
                    .map_err(storage("List runs"))?;
                rows.filter_map(|r| r.ok()).collect()
            }
            None => {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, agent_id, status, output, error, duration_ms, created_at FROM runs \
                         ORDER BY created_at DESC LIMIT ?1",
                    )
                    .map_err(storage("List runs"))?;
                let rows = stmt
                    .query_map(params![limit as i64], row_to_run)
                    .map_err(storage("List runs"))?;
                rows.filter_map(|r| r.ok()).collect()
            }
        };
        Ok(runs)
    }

    fn insert_run(conn: &Connection, run: &NewRun, created_at: DateTime<Utc>) -> rusqlite::Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO runs (id, agent_id, status, output, error, duration_ms, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                run.agent_id,
                run.status.as_str(),
                run.output.to_string(),
                run.error,
                run.duration_ms,
                created_at.to_rfc3339(),
            ],
        )?;
        Ok(id)
    }
}

impl TriggerStore for MorodasDb {
    fn due_triggers(&self, now: DateTime<Utc>) -> Result<Vec<DueTrigger>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT t.id, t.agent_id, t.name, t.frequency, t.day_of_week, t.day_of_month,
                        t.hour, t.minute, t.enabled, t.next_fire_at, t.last_fired_at, t.created_at,
                        a.name, a.enabled
                 FROM triggers t
                 JOIN agents a ON a.id = t.agent_id
                 WHERE t.enabled = 1 AND t.next_fire_at IS NOT NULL AND t.next_fire_at <= ?1
                 ORDER BY t.next_fire_at",
            )
            .map_err(storage("Due triggers"))?;
        let due = stmt
            .query_map([now.to_rfc3339()], |row| {
                let trigger = row_to_trigger(row)?;
                let agent_id = trigger.agent_id.clone();
                Ok(DueTrigger {
                    trigger,
                    agent_id,
                    agent_name: row.get(12)?,
                    agent_enabled: row.get::<_, i64>(13)? != 0,
                })
            })
            .map_err(storage("Due triggers"))?
            .filter_map(|d| d.ok())
            .collect();
        Ok(due)
    }

    fn append_run(&self, run: &NewRun) -> Result<String> {
        let conn = self.lock()?;
        Self::insert_run(&conn, run, Utc::now()).map_err(storage("Append run"))
    }

    fn record_fire(
        &self,
        trigger_id: &str,
        run: &NewRun,
        last_fired_at: DateTime<Utc>,
        next_fire_at: DateTime<Utc>,
    ) -> Result<String> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(storage("Record fire"))?;

        let run_id = Self::insert_run(&tx, run, last_fired_at).map_err(storage("Record fire"))?;
        let updated = tx
            .execute(
                "UPDATE triggers SET last_fired_at = ?1, next_fire_at = ?2 WHERE id = ?3",
                params![last_fired_at.to_rfc3339(), next_fire_at.to_rfc3339(), trigger_id],
            )
            .map_err(storage("Record fire"))?;
        if updated == 0 {
            // trigger vanished mid-sweep — dropping the tx rolls back the run
            return Err(MorodasError::NotFound(format!("trigger {trigger_id}")));
        }
        tx.execute(
            "UPDATE agents SET last_run_at = ?1 WHERE id = ?2",
            params![last_fired_at.to_rfc3339(), run.agent_id],
        )
        .map_err(storage("Record fire"))?;

        tx.commit().map_err(storage("Record fire"))?;
        Ok(run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use morodas_scheduler::store::RunStatus;
    use morodas_scheduler::trigger::SchedulePatch;

    fn open_test_db(name: &str) -> (MorodasDb, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("morodas-db-test-{name}"));
        std::fs::create_dir_all(&dir).ok();
        let path = dir.join("test.db");
        std::fs::remove_file(&path).ok();
        (MorodasDb::open(&path).unwrap(), dir)
    }

    fn at(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    fn nine_daily() -> Schedule {
        Schedule { frequency: Frequency::Daily, day_of_week: None, day_of_month: None, hour: 9, minute: 0 }
    }

    #[test]
    fn test_agent_crud_roundtrip() {
        let (db, dir) = open_test_db("agent-crud");
        let agent = db.create_agent("Lead Hunter", "prospecting", true).unwrap();
        assert_eq!(db.list_agents().unwrap().len(), 1);

        let patched = db
            .update_agent(&agent.id, &AgentPatch { enabled: Some(false), ..Default::default() })
            .unwrap();
        assert!(!patched.enabled);
        assert_eq!(patched.name, "Lead Hunter");

        assert!(db.delete_agent(&agent.id).unwrap());
        assert!(db.get_agent(&agent.id).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_trigger_create_computes_next_fire() {
        let (db, dir) = open_test_db("trigger-create");
        let agent = db.create_agent("a", "workflow", true).unwrap();
        let trigger = db
            .create_trigger(&agent.id, "daily digest", nine_daily(), true, at(2026, 3, 11, 0))
            .unwrap();
        assert!(trigger.next_fire_at.is_some());

        let loaded = db.get_trigger(&trigger.id).unwrap();
        assert_eq!(loaded.next_fire_at, trigger.next_fire_at);
        assert_eq!(loaded.schedule, trigger.schedule);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_trigger_for_unknown_agent_rejected() {
        let (db, dir) = open_test_db("trigger-orphan");
        let err = db.create_trigger("nope", "t", nine_daily(), true, at(2026, 3, 11, 0));
        assert!(matches!(err, Err(MorodasError::NotFound(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_disable_clears_and_reenable_recomputes() {
        let (db, dir) = open_test_db("trigger-toggle");
        let agent = db.create_agent("a", "workflow", true).unwrap();
        let trigger = db
            .create_trigger(&agent.id, "t", nine_daily(), true, at(2026, 3, 11, 0))
            .unwrap();

        let off = db
            .update_trigger(&trigger.id, &TriggerPatch { enabled: Some(false), ..Default::default() }, at(2026, 3, 11, 1))
            .unwrap();
        assert!(off.next_fire_at.is_none());

        let on = db
            .update_trigger(&trigger.id, &TriggerPatch { enabled: Some(true), ..Default::default() }, at(2026, 3, 12, 1))
            .unwrap();
        assert!(on.next_fire_at.is_some());
        assert!(on.next_fire_at.unwrap() > at(2026, 3, 12, 1));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_schedule_patch_merges_and_recomputes() {
        let (db, dir) = open_test_db("trigger-patch");
        let agent = db.create_agent("a", "workflow", true).unwrap();
        let trigger = db
            .create_trigger(&agent.id, "t", nine_daily(), true, at(2026, 3, 11, 0))
            .unwrap();

        let patch = TriggerPatch {
            schedule: SchedulePatch {
                frequency: Some(Frequency::Weekly),
                day_of_week: Some(1),
                ..Default::default()
            },
            ..Default::default()
        };
        let updated = db.update_trigger(&trigger.id, &patch, at(2026, 3, 11, 0)).unwrap();
        assert_eq!(updated.schedule.frequency, Frequency::Weekly);
        // untouched fields kept
        assert_eq!(updated.schedule.hour, 9);
        assert_ne!(updated.next_fire_at, trigger.next_fire_at);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_due_triggers_join_and_filter() {
        let (db, dir) = open_test_db("due");
        let active = db.create_agent("active", "workflow", true).unwrap();
        let disabled = db.create_agent("disabled", "workflow", false).unwrap();

        let t0 = at(2026, 3, 11, 0);
        db.create_trigger(&active.id, "due-1", nine_daily(), true, t0).unwrap();
        db.create_trigger(&disabled.id, "due-2", nine_daily(), true, t0).unwrap();
        // disabled trigger: no next_fire_at, never due
        db.create_trigger(&active.id, "off", nine_daily(), false, t0).unwrap();

        let due = db.due_triggers(at(2026, 3, 13, 0)).unwrap();
        assert_eq!(due.len(), 2);
        // the disabled-agent trigger is returned with its flag — the sweep decides
        let flags: Vec<bool> = due.iter().map(|d| d.agent_enabled).collect();
        assert!(flags.contains(&true) && flags.contains(&false));

        // nothing due before the fire time
        assert!(db.due_triggers(t0).unwrap().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_record_fire_commits_all_three_writes() {
        let (db, dir) = open_test_db("fire");
        let agent = db.create_agent("a", "workflow", true).unwrap();
        let t0 = at(2026, 3, 11, 0);
        let trigger = db.create_trigger(&agent.id, "t", nine_daily(), true, t0).unwrap();

        let now = at(2026, 3, 12, 1);
        let next = at(2026, 3, 13, 0);
        let run = NewRun {
            agent_id: agent.id.clone(),
            status: RunStatus::Completed,
            output: serde_json::json!({"trigger_id": trigger.id}),
            error: None,
            duration_ms: Some(5),
        };
        let run_id = db.record_fire(&trigger.id, &run, now, next).unwrap();

        let fired = db.get_trigger(&trigger.id).unwrap();
        assert_eq!(fired.last_fired_at, Some(now));
        assert_eq!(fired.next_fire_at, Some(next));
        assert_eq!(db.get_agent(&agent.id).unwrap().last_run_at, Some(now));

        let runs = db.list_runs(Some(&agent.id), 10).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, run_id);
        assert_eq!(runs[0].status, "completed");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_record_fire_rolls_back_on_missing_trigger() {
        let (db, dir) = open_test_db("fire-rollback");
        let agent = db.create_agent("a", "workflow", true).unwrap();
        let run = NewRun {
            agent_id: agent.id.clone(),
            status: RunStatus::Completed,
            output: serde_json::json!({}),
            error: None,
            duration_ms: None,
        };
        let err = db.record_fire("ghost", &run, at(2026, 3, 12, 1), at(2026, 3, 13, 0));
        assert!(err.is_err());
        // the run insert rolled back with the transaction
        assert!(db.list_runs(None, 10).unwrap().is_empty());
        assert!(db.get_agent(&agent.id).unwrap().last_run_at.is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_delete_agent_cascades_triggers_keeps_runs() {
        let (db, dir) = open_test_db("cascade");
        let agent = db.create_agent("a", "workflow", true).unwrap();
        let trigger = db
            .create_trigger(&agent.id, "t", nine_daily(), true, at(2026, 3, 11, 0))
            .unwrap();
        db.append_run(&NewRun {
            agent_id: agent.id.clone(),
            status: RunStatus::Failed,
            output: serde_json::json!({}),
            error: Some("boom".into()),
            duration_ms: None,
        })
        .unwrap();

        db.delete_agent(&agent.id).unwrap();
        assert!(db.get_trigger(&trigger.id).is_err());
        assert_eq!(db.list_runs(None, 10).unwrap().len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }
}
