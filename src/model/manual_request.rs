use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ManualRequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Approval-pending proposal raised when live gating blocks a worker. It
/// never touches the attendance record itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ManualAttendanceRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "6f1c2d9e-8f9b-4a55-9a3e-2a6f5f2c1b7d", value_type = String)]
    pub reference: Uuid,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "08:00:00", format = "time", value_type = String)]
    pub entry_time: NaiveTime,
    #[schema(example = "17:00:00", format = "time", value_type = Option<String>)]
    pub exit_time: Option<NaiveTime>,
    #[schema(example = "GPS unavailable on site")]
    pub reason: String,
    pub status: ManualRequestStatus,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}
