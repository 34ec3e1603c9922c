//! Trigger data model — recurring schedule rules bound to agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::recurrence::next_fire_at;

/// How often a trigger fires.
///
/// Unrecognized values decay to `Daily` at parse time — a malformed
/// frequency is not an error anywhere in the system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// Parse a stored or user-supplied value. Anything unknown is daily.
    pub fn parse(value: &str) -> Self {
        match value {
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            _ => Self::Daily,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl From<String> for Frequency {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Frequency> for String {
    fn from(value: Frequency) -> Self {
        value.as_str().to_string()
    }
}

/// The recurrence rule portion of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default)]
    pub frequency: Frequency,
    /// 0 = Sunday .. 6 = Saturday. Consulted only when weekly.
    #[serde(default)]
    pub day_of_week: Option<u8>,
    /// 1..=31. Consulted only when monthly.
    #[serde(default)]
    pub day_of_month: Option<u8>,
    #[serde(default = "default_hour")]
    pub hour: u8,
    #[serde(default)]
    pub minute: u8,
}

fn default_hour() -> u8 { 9 }

impl Schedule {
    /// Merge a partial update over this schedule, producing the new
    /// effective rule. Pure — callers recompute `next_fire_at` from the
    /// result.
    pub fn merged(&self, patch: &SchedulePatch) -> Schedule {
        Schedule {
            frequency: patch.frequency.unwrap_or(self.frequency),
            day_of_week: patch.day_of_week.or(self.day_of_week),
            day_of_month: patch.day_of_month.or(self.day_of_month),
            hour: patch.hour.unwrap_or(self.hour),
            minute: patch.minute.unwrap_or(self.minute),
        }
    }
}

/// Typed partial update for the mutable schedule fields.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SchedulePatch {
    pub frequency: Option<Frequency>,
    pub day_of_week: Option<u8>,
    pub day_of_month: Option<u8>,
    pub hour: Option<u8>,
    pub minute: Option<u8>,
}

impl SchedulePatch {
    /// True when any recurrence field is present in the patch.
    pub fn touches_schedule(&self) -> bool {
        self.frequency.is_some()
            || self.day_of_week.is_some()
            || self.day_of_month.is_some()
            || self.hour.is_some()
            || self.minute.is_some()
    }
}

/// Partial update for a trigger row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerPatch {
    pub name: Option<String>,
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub schedule: SchedulePatch,
}

/// A recurring schedule bound to one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub id: String,
    pub agent_id: String,
    pub name: String,
    #[serde(flatten)]
    pub schedule: Schedule,
    pub enabled: bool,
    /// Next computed fire instant. `None` means "not scheduled" (disabled).
    pub next_fire_at: Option<DateTime<Utc>>,
    pub last_fired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Trigger {
    /// Create a new trigger with its initial computed fire time.
    pub fn new(
        agent_id: &str,
        name: &str,
        schedule: Schedule,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent_id.to_string(),
            name: name.to_string(),
            schedule,
            enabled,
            next_fire_at: enabled.then(|| next_fire_at(&schedule, now)),
            last_fired_at: None,
            created_at: now,
        }
    }

    /// Whether this trigger is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_fire_at.is_some_and(|next| next <= now)
    }

    /// Apply a partial update, keeping `next_fire_at` consistent:
    /// schedule edits and a disabled→enabled transition recompute it from
    /// `now`; any transition to disabled clears it, whatever else changed
    /// in the same patch.
    pub fn apply(&self, patch: &TriggerPatch, now: DateTime<Utc>) -> Trigger {
        let mut updated = self.clone();
        if let Some(name) = &patch.name {
            updated.name = name.clone();
        }
        updated.schedule = self.schedule.merged(&patch.schedule);
        if let Some(enabled) = patch.enabled {
            updated.enabled = enabled;
        }

        if !updated.enabled {
            updated.next_fire_at = None;
        } else if patch.schedule.touches_schedule() || !self.enabled || updated.next_fire_at.is_none() {
            updated.next_fire_at = Some(next_fire_at(&updated.schedule, now));
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn nine_daily() -> Schedule {
        Schedule { frequency: Frequency::Daily, day_of_week: None, day_of_month: None, hour: 9, minute: 0 }
    }

    #[test]
    fn test_unknown_frequency_behaves_as_daily() {
        assert_eq!(Frequency::parse("biweekly"), Frequency::Daily);
        assert_eq!(Frequency::parse(""), Frequency::Daily);
        assert_eq!(Frequency::parse("weekly"), Frequency::Weekly);

        let schedule: Schedule = serde_json::from_str(r#"{"frequency":"whenever","hour":9}"#).unwrap();
        assert_eq!(schedule.frequency, Frequency::Daily);
    }

    #[test]
    fn test_new_trigger_gets_initial_fire_time() {
        let now = at(2026, 3, 11, 0, 0);
        let trigger = Trigger::new("agent-1", "morning digest", nine_daily(), true, now);
        assert!(trigger.next_fire_at.is_some());
        assert!(trigger.next_fire_at.unwrap() > now);
        assert!(trigger.last_fired_at.is_none());
    }

    #[test]
    fn test_new_disabled_trigger_is_unscheduled() {
        let trigger = Trigger::new("agent-1", "paused", nine_daily(), false, at(2026, 3, 11, 0, 0));
        assert!(trigger.next_fire_at.is_none());
    }

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let merged = nine_daily().merged(&SchedulePatch { minute: Some(30), ..Default::default() });
        assert_eq!(merged.hour, 9);
        assert_eq!(merged.minute, 30);
        assert_eq!(merged.frequency, Frequency::Daily);
    }

    #[test]
    fn test_disable_clears_next_fire_even_with_schedule_edits() {
        let now = at(2026, 3, 11, 0, 0);
        let trigger = Trigger::new("agent-1", "t", nine_daily(), true, now);
        let patch = TriggerPatch {
            enabled: Some(false),
            schedule: SchedulePatch { hour: Some(12), ..Default::default() },
            ..Default::default()
        };
        let updated = trigger.apply(&patch, now);
        assert!(!updated.enabled);
        assert!(updated.next_fire_at.is_none());
        assert_eq!(updated.schedule.hour, 12);
    }

    #[test]
    fn test_reenable_recomputes_next_fire() {
        let now = at(2026, 3, 11, 0, 0);
        let trigger = Trigger::new("agent-1", "t", nine_daily(), false, now);
        let later = at(2026, 3, 20, 0, 0);
        let updated = trigger.apply(
            &TriggerPatch { enabled: Some(true), ..Default::default() },
            later,
        );
        assert!(updated.next_fire_at.is_some());
        assert!(updated.next_fire_at.unwrap() > later);
    }

    #[test]
    fn test_schedule_edit_recomputes_next_fire() {
        let now = at(2026, 3, 11, 0, 0);
        let trigger = Trigger::new("agent-1", "t", nine_daily(), true, now);
        let patch = TriggerPatch {
            schedule: SchedulePatch { hour: Some(18), ..Default::default() },
            ..Default::default()
        };
        let updated = trigger.apply(&patch, now);
        assert_ne!(updated.next_fire_at, trigger.next_fire_at);
        assert_eq!(updated.schedule.hour, 18);
    }

    #[test]
    fn test_rename_alone_keeps_next_fire() {
        let now = at(2026, 3, 11, 0, 0);
        let trigger = Trigger::new("agent-1", "t", nine_daily(), true, now);
        let updated = trigger.apply(
            &TriggerPatch { name: Some("renamed".into()), ..Default::default() },
            at(2026, 3, 11, 5, 0),
        );
        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.next_fire_at, trigger.next_fire_at);
    }

    #[test]
    fn test_is_due() {
        let now = at(2026, 3, 11, 0, 0);
        let mut trigger = Trigger::new("agent-1", "t", nine_daily(), true, now);
        assert!(!trigger.is_due(now));
        assert!(trigger.is_due(at(2026, 3, 12, 12, 0)));
        trigger.enabled = false;
        assert!(!trigger.is_due(at(2026, 3, 12, 12, 0)));
    }
}
