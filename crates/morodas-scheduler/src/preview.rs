//! Schedule preview — the next N fire instants for display and validation.

use chrono::{DateTime, Duration, Utc};

use crate::recurrence::next_fire_at;
use crate::trigger::Schedule;

/// Generate the next `count` fire instants of `schedule` starting from
/// `from`. Pure and restartable: the same inputs reproduce the same
/// sequence.
pub fn upcoming(schedule: &Schedule, count: usize, from: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let mut fires = Vec::with_capacity(count);
    let mut cursor = from;
    for _ in 0..count {
        let fire = next_fire_at(schedule, cursor);
        // nudge one minute past the result: the calculator treats the exact
        // minute as already passed, so this yields the following occurrence
        cursor = fire + Duration::minutes(1);
        fires.push(fire);
    }
    fires
}
