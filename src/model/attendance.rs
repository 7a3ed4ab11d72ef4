use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use utoipa::ToSchema;

/// One worker's attendance for one local calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "PRJ-001")]
    pub project_code: String,
    #[schema(example = "2026-01-01T02:05:00Z", format = "date-time", value_type = Option<String>)]
    pub check_in: Option<DateTime<Utc>>,
    #[schema(example = "2026-01-01T11:02:00Z", format = "date-time", value_type = Option<String>)]
    pub check_out: Option<DateTime<Utc>>,
    pub check_in_latitude: Option<f64>,
    pub check_in_longitude: Option<f64>,
    pub check_out_latitude: Option<f64>,
    pub check_out_longitude: Option<f64>,
    pub is_holiday_work: bool,
    pub is_weekend_work: bool,
}

impl AttendanceRecord {
    pub fn state(&self) -> SessionState {
        match (self.check_in, self.check_out) {
            (_, Some(_)) => SessionState::CheckedOut,
            (Some(_), None) => SessionState::CheckedIn,
            (None, None) => SessionState::NotCheckedIn,
        }
    }
}

/// Derived from today's record on every read; never stored.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, AsRefStr, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    NotCheckedIn,
    CheckedIn,
    CheckedOut,
}

impl SessionState {
    pub fn from_record(record: Option<&AttendanceRecord>) -> Self {
        record.map_or(SessionState::NotCheckedIn, AttendanceRecord::state)
    }

    pub fn has_checked_in(self) -> bool {
        self != SessionState::NotCheckedIn
    }

    pub fn has_checked_out(self) -> bool {
        self == SessionState::CheckedOut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> AttendanceRecord {
        AttendanceRecord {
            employee_id: 7,
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            project_code: "PRJ-001".into(),
            check_in: None,
            check_out: None,
            check_in_latitude: None,
            check_in_longitude: None,
            check_out_latitude: None,
            check_out_longitude: None,
            is_holiday_work: false,
            is_weekend_work: false,
        }
    }

    #[test]
    fn state_follows_entry_and_exit_times() {
        let mut r = record();
        assert_eq!(r.state(), SessionState::NotCheckedIn);

        r.check_in = Some(Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap());
        assert_eq!(r.state(), SessionState::CheckedIn);

        r.check_out = Some(Utc.with_ymd_and_hms(2026, 1, 5, 17, 0, 0).unwrap());
        assert_eq!(r.state(), SessionState::CheckedOut);
    }

    #[test]
    fn missing_record_means_not_checked_in() {
        assert_eq!(SessionState::from_record(None), SessionState::NotCheckedIn);
        assert_eq!(SessionState::CheckedIn.to_string(), "CHECKED_IN");
    }
}
