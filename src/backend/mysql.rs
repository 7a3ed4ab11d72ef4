use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::MySqlPool;
use tracing::debug;
use uuid::Uuid;

use super::{AttendanceBackend, BackendError, NewCheckIn, NewCheckOut};
use crate::attendance::manual::ValidManualRequest;
use crate::model::attendance::AttendanceRecord;
use crate::model::geofence::{GeoFence, ProjectSite};
use crate::model::manual_request::{ManualAttendanceRequest, ManualRequestStatus};
use crate::model::schedule::ScopedSchedule;

const DUPLICATE_KEY: &str = "23000";

pub struct MySqlBackend {
    pool: MySqlPool,
}

impl MySqlBackend {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_record(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, BackendError> {
        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT employee_id, date, project_code, check_in, check_out,
                   check_in_latitude, check_in_longitude,
                   check_out_latitude, check_out_longitude,
                   is_holiday_work, is_weekend_work
            FROM attendance
            WHERE employee_id = ?
            AND date = ?
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn fetch_existing(&self, employee_id: u64, date: NaiveDate) -> Result<AttendanceRecord, BackendError> {
        self.fetch_record(employee_id, date)
            .await?
            .ok_or_else(|| BackendError::Conflict("attendance row vanished after write".into()))
    }
}

#[async_trait]
impl AttendanceBackend for MySqlBackend {
    async fn get_active_work_schedules(&self) -> Result<Vec<ScopedSchedule>, BackendError> {
        let schedules = sqlx::query_as::<_, ScopedSchedule>(
            r#"
            SELECT id, project_code, department_code, start_time, end_time, is_active
            FROM work_schedules
            WHERE is_active = TRUE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = schedules.len(), "Loaded active work schedules");
        Ok(schedules)
    }

    async fn get_project_geofence(&self, project_code: &str) -> Result<GeoFence, BackendError> {
        let site = sqlx::query_as::<_, ProjectSite>(
            r#"
            SELECT latitude, longitude, geofence_radius_m
            FROM projects
            WHERE code = ?
            "#,
        )
        .bind(project_code)
        .fetch_optional(&self.pool)
        .await?;

        site.map(GeoFence::from)
            .ok_or_else(|| BackendError::UnknownProject(project_code.to_string()))
    }

    async fn get_worker_department(&self, employee_id: u64) -> Result<Option<String>, BackendError> {
        let code = sqlx::query_scalar::<_, String>(
            r#"
            SELECT d.code
            FROM employees e
            JOIN departments d ON d.id = e.department_id
            WHERE e.id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(code)
    }

    async fn is_holiday(&self, date: NaiveDate) -> Result<bool, BackendError> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM holidays WHERE date = ? LIMIT 1)",
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists != 0)
    }

    async fn get_today_attendance(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, BackendError> {
        self.fetch_record(employee_id, date).await
    }

    async fn check_in(&self, entry: NewCheckIn) -> Result<AttendanceRecord, BackendError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
                (employee_id, date, project_code, check_in,
                 check_in_latitude, check_in_longitude,
                 is_holiday_work, is_weekend_work)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.employee_id)
        .bind(entry.date)
        .bind(&entry.project_code)
        .bind(entry.timestamp)
        .bind(entry.position.latitude)
        .bind(entry.position.longitude)
        .bind(entry.is_holiday_work)
        .bind(entry.is_weekend_work)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            // Duplicate check-in for same day
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some(DUPLICATE_KEY) {
                    return Err(BackendError::Conflict("already checked in today".into()));
                }
            }
            return Err(e.into());
        }

        self.fetch_existing(entry.employee_id, entry.date).await
    }

    async fn check_out(&self, exit: NewCheckOut) -> Result<AttendanceRecord, BackendError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out = ?, check_out_latitude = ?, check_out_longitude = ?
            WHERE employee_id = ?
            AND date = ?
            AND check_in IS NOT NULL
            AND check_out IS NULL
            "#,
        )
        .bind(exit.timestamp)
        .bind(exit.position.latitude)
        .bind(exit.position.longitude)
        .bind(exit.employee_id)
        .bind(exit.date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BackendError::Conflict(
                "no active check-in found for today".into(),
            ));
        }

        self.fetch_existing(exit.employee_id, exit.date).await
    }

    async fn submit_manual_attendance_request(
        &self,
        employee_id: u64,
        request: ValidManualRequest,
    ) -> Result<ManualAttendanceRequest, BackendError> {
        let reference = Uuid::new_v4();
        let created_at = Utc::now();
        let status = ManualRequestStatus::Pending;

        let result = sqlx::query(
            r#"
            INSERT INTO manual_attendance_requests
                (reference, employee_id, date, entry_time, exit_time, reason, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(reference.to_string())
        .bind(employee_id)
        .bind(request.date)
        .bind(request.entry_time)
        .bind(request.exit_time)
        .bind(&request.reason)
        .bind(status.to_string())
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(ManualAttendanceRequest {
            id: result.last_insert_id(),
            reference,
            employee_id,
            date: request.date,
            entry_time: request.entry_time,
            exit_time: request.exit_time,
            reason: request.reason,
            status,
            created_at,
        })
    }
}
