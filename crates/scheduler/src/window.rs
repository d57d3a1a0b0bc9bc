use std::str::FromStr;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Pure gating predicate: true iff `now_utc`, viewed in `tz_name`'s wall
/// clock, falls in `[start, end)`. An overnight window (`start > end`) is
/// interpreted as the union `[start, 24:00) ∪ [00:00, end)`. Any parse or
/// timezone-lookup failure returns `false` — callers are expected to log.
pub fn is_within_window(start: &str, end: &str, tz_name: &str, now_utc: DateTime<Utc>) -> bool {
    let Some(start) = parse_hhmm(start) else { return false };
    let Some(end) = parse_hhmm(end) else { return false };
    let Ok(tz) = Tz::from_str(tz_name) else { return false };

    let local_time = now_utc.with_timezone(&tz).time();

    if start <= end {
        local_time >= start && local_time < end
    } else {
        local_time >= start || local_time < end
    }
}

/// Converts an `HH:MM` wall-clock time in `tz_name`, as observed *today*,
/// into a six-field `sec min hour * * *` cron expression in UTC. Returns
/// `None` on a malformed time or unknown timezone.
///
/// The UTC offset used is the one in effect today; a daylight-saving
/// transition shifts the wall-clock firing time until the scheduler next
/// reinstalls the group's window jobs (group update or process restart).
pub fn daily_utc_cron(hhmm: &str, tz_name: &str) -> Option<String> {
    let local_time = parse_hhmm(hhmm)?;
    let tz = Tz::from_str(tz_name).ok()?;

    let today = Utc::now().with_timezone(&tz).date_naive();
    let local_dt = tz.from_local_datetime(&today.and_time(local_time)).earliest()?;
    let utc_dt = local_dt.with_timezone(&Utc);

    Some(format!("0 {} {} * * *", utc_dt.minute_field(), utc_dt.hour_field()))
}

trait TimeFields {
    fn minute_field(&self) -> u32;
    fn hour_field(&self) -> u32;
}

impl TimeFields for DateTime<Utc> {
    fn minute_field(&self) -> u32 {
        use chrono::Timelike;
        self.minute()
    }

    fn hour_field(&self) -> u32 {
        use chrono::Timelike;
        self.hour()
    }
}
