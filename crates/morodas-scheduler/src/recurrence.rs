//! Recurrence calculator — next fire instant for a schedule rule.
//! All civil arithmetic happens in a constant UTC+09:00 offset (no DST),
//! never the host zone, so the same inputs always produce the same output.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};

use crate::trigger::{Frequency, Schedule};

/// The fixed civil zone for all schedule math: UTC+09:00.
pub const ZONE_OFFSET_SECS: i32 = 9 * 3600;

/// Weekday used when a weekly schedule has no `day_of_week` (1 = Monday).
pub const DEFAULT_DAY_OF_WEEK: u8 = 1;

/// Day used when a monthly schedule has no `day_of_month`.
pub const DEFAULT_DAY_OF_MONTH: u8 = 1;

fn agency_zone() -> FixedOffset {
    // +09:00 is always representable
    FixedOffset::east_opt(ZONE_OFFSET_SECS).expect("fixed offset in range")
}

/// Compute the next fire instant for `schedule` strictly after `reference`.
///
/// Total over its inputs: an unrecognized frequency already decayed to
/// [`Frequency::Daily`] at parse time, and out-of-range time fields are the
/// caller's responsibility (clamped here so the math stays total).
///
/// A reference exactly on the scheduled minute counts as already passed and
/// rolls one full period forward — firing the current minute is the sweep's
/// job, not the calculator's.
pub fn next_fire_at(schedule: &Schedule, reference: DateTime<Utc>) -> DateTime<Utc> {
    let zone = agency_zone();
    let local = reference.with_timezone(&zone);
    let hour = u32::from(schedule.hour).min(23);
    let minute = u32::from(schedule.minute).min(59);

    let passed = local.hour() > hour || (local.hour() == hour && local.minute() >= minute);
    let today = local.date_naive();

    let date = match schedule.frequency {
        Frequency::Daily => {
            if passed { today + Days::new(1) } else { today }
        }
        Frequency::Weekly => {
            let target = u32::from(schedule.day_of_week.unwrap_or(DEFAULT_DAY_OF_WEEK)).min(6);
            let current = local.weekday().num_days_from_sunday();
            let mut ahead = (target + 7 - current) % 7;
            if ahead == 0 && passed {
                // today is the target weekday but the time already went by
                ahead = 7;
            }
            today + Days::new(u64::from(ahead))
        }
        Frequency::Monthly => {
            let target = u32::from(schedule.day_of_month.unwrap_or(DEFAULT_DAY_OF_MONTH));
            let rolls = local.day() > target || (local.day() == target && passed);
            let (year, month) = if rolls {
                next_month(local.year(), local.month())
            } else {
                (local.year(), local.month())
            };
            civil_date(year, month, target)
        }
    };

    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    match date.and_time(time).and_local_timezone(zone) {
        chrono::LocalResult::Single(at) => at.with_timezone(&Utc),
        // unreachable with a fixed offset; stay total anyway
        _ => reference,
    }
}

/// Build a civil date, letting an out-of-range day roll into the following
/// month the way plain calendar day arithmetic does (day 31 of a 30-day
/// month becomes the 1st of the next month, day 31 of February the 3rd of
/// March).
fn civil_date(year: i32, month: u32, day: u32) -> NaiveDate {
    let day = day.clamp(1, 31);
    NaiveDate::from_ymd_opt(year, month, day)
        .or_else(|| {
            let (next_year, next_mon) = next_month(year, month);
            NaiveDate::from_ymd_opt(next_year, next_mon, day - days_in_month(year, month))
        })
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default())
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_mon) = next_month(year, month);
    NaiveDate::from_ymd_opt(next_year, next_mon, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 { (year + 1, 1) } else { (year, month + 1) }
}
