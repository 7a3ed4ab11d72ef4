use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use strum::Display;
use utoipa::ToSchema;

use crate::model::schedule::{WorkSchedule, minute_of_day};

/// Tolerance after the scheduled start before a check-in counts as late.
pub const GRACE_WINDOW_MINUTES: i64 = 15;

/// Beyond this much elapsed time an un-checked-in worker is assumed to be
/// looking at tomorrow's shift.
const NEXT_DAY_THRESHOLD_HOURS: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Early,
    OnTime,
    Late,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ClockReading {
    /// Signed whole minutes from scheduled start; negative means before.
    pub minutes_delta: i64,
    pub direction: Direction,
    pub grace_window_minutes: i64,
}

impl ClockReading {
    /// "5 minutes late", "1 hour 5 minutes early", "On time".
    pub fn label(&self) -> String {
        match self.direction {
            Direction::OnTime => "On time".to_string(),
            Direction::Early => format!("{} early", format_minutes(self.minutes_delta.abs())),
            Direction::Late => format!("{} late", format_minutes(self.minutes_delta.abs())),
        }
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

fn format_minutes(total: i64) -> String {
    let hours = total / 60;
    let minutes = total % 60;
    match (hours, minutes) {
        (0, m) => plural(m, "minute"),
        (h, 0) => plural(h, "hour"),
        (h, m) => format!("{} {}", plural(h, "hour"), plural(m, "minute")),
    }
}

fn to_local(instant: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

/// Where the worker stands relative to the scheduled start.
///
/// The reference point is the recorded check-in once there is one,
/// otherwise `now`. Before check-in there is no ON_TIME state: the worker
/// is either early or late.
pub fn evaluate(
    schedule: &WorkSchedule,
    now: DateTime<Utc>,
    tz: Tz,
    check_in_time: Option<DateTime<Utc>>,
) -> ClockReading {
    let has_checked_in = check_in_time.is_some();
    let reference = to_local(check_in_time.unwrap_or(now), tz);

    let mut scheduled_start = reference.date().and_time(schedule.start_time);

    // Known approximation: a shift missed by more than 12 hours reads as
    // tomorrow's upcoming shift rather than a very late one.
    if !has_checked_in && reference - scheduled_start > Duration::hours(NEXT_DAY_THRESHOLD_HOURS) {
        scheduled_start += Duration::days(1);
    }

    let minutes_delta = (reference - scheduled_start).num_seconds().div_euclid(60);

    let direction = if minutes_delta < 0 {
        Direction::Early
    } else if has_checked_in && minutes_delta <= GRACE_WINDOW_MINUTES {
        Direction::OnTime
    } else {
        Direction::Late
    };

    ClockReading {
        minutes_delta,
        direction,
        grace_window_minutes: GRACE_WINDOW_MINUTES,
    }
}

/// True once the scheduled window has fully elapsed, which closes
/// check-in. For a midnight-crossing shift the closed zone is the gap
/// between its end and the next start.
pub fn is_after_scheduled_end(schedule: &WorkSchedule, now: DateTime<Utc>, tz: Tz) -> bool {
    let now_minute = minute_of_day(to_local(now, tz).time());
    let start = schedule.start_minute_of_day();
    let end = schedule.end_minute_of_day();

    if schedule.crosses_midnight() {
        now_minute > end && now_minute < start
    } else {
        now_minute > end
    }
}
