use chrono::{NaiveTime, Timelike};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Used when no active schedule matches a worker. Always flagged by the
/// resolver so the configuration gap stays visible.
pub static FALLBACK_SCHEDULE: Lazy<WorkSchedule> = Lazy::new(|| WorkSchedule {
    start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
    end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WorkSchedule {
    #[schema(example = "08:00:00", value_type = String, format = "time")]
    pub start_time: NaiveTime,
    #[schema(example = "17:00:00", value_type = String, format = "time")]
    pub end_time: NaiveTime,
}

impl WorkSchedule {
    pub fn new(start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// The shift spans two calendar days (e.g. 22:00–06:00).
    pub fn crosses_midnight(&self) -> bool {
        self.end_time < self.start_time
    }

    pub fn start_minute_of_day(&self) -> u32 {
        minute_of_day(self.start_time)
    }

    pub fn end_minute_of_day(&self) -> u32 {
        minute_of_day(self.end_time)
    }
}

pub(crate) fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// A schedule together with the scope it was defined for. A schedule with
/// neither a project nor a department is the organization default.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ScopedSchedule {
    pub id: u64,
    pub project_code: Option<String>,
    pub department_code: Option<String>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
}

impl ScopedSchedule {
    pub fn schedule(&self) -> WorkSchedule {
        WorkSchedule::new(self.start_time, self.end_time)
    }
}
