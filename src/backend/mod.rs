//! Collaborator contracts the attendance core consumes.

pub mod mysql;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::attendance::manual::ValidManualRequest;
use crate::model::attendance::AttendanceRecord;
use crate::model::geofence::{Coordinate, GeoFence};
use crate::model::manual_request::ManualAttendanceRequest;
use crate::model::schedule::ScopedSchedule;

#[derive(Debug, Error)]
pub enum BackendError {
    /// Local and server state diverged (double submission, another device).
    #[error("attendance conflict: {0}")]
    Conflict(String),

    #[error("project {0} not found")]
    UnknownProject(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct NewCheckIn {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub project_code: String,
    pub position: Coordinate,
    pub timestamp: DateTime<Utc>,
    pub is_holiday_work: bool,
    pub is_weekend_work: bool,
}

#[derive(Debug, Clone)]
pub struct NewCheckOut {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub position: Coordinate,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait AttendanceBackend: Send + Sync {
    async fn get_active_work_schedules(&self) -> Result<Vec<ScopedSchedule>, BackendError>;

    async fn get_project_geofence(&self, project_code: &str) -> Result<GeoFence, BackendError>;

    async fn get_worker_department(&self, employee_id: u64) -> Result<Option<String>, BackendError>;

    async fn is_holiday(&self, date: NaiveDate) -> Result<bool, BackendError>;

    /// Record keyed by the worker's local date.
    async fn get_today_attendance(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, BackendError>;

    /// Fails with [`BackendError::Conflict`] when already checked in.
    async fn check_in(&self, entry: NewCheckIn) -> Result<AttendanceRecord, BackendError>;

    /// Fails with [`BackendError::Conflict`] when not checked in or already
    /// checked out.
    async fn check_out(&self, exit: NewCheckOut) -> Result<AttendanceRecord, BackendError>;

    async fn submit_manual_attendance_request(
        &self,
        employee_id: u64,
        request: ValidManualRequest,
    ) -> Result<ManualAttendanceRequest, BackendError>;
}
