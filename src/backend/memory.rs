use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use super::{AttendanceBackend, BackendError, NewCheckIn, NewCheckOut};
use crate::attendance::manual::ValidManualRequest;
use crate::model::attendance::AttendanceRecord;
use crate::model::geofence::GeoFence;
use crate::model::manual_request::{ManualAttendanceRequest, ManualRequestStatus};
use crate::model::schedule::ScopedSchedule;

#[derive(Default)]
struct Tables {
    schedules: Vec<ScopedSchedule>,
    fences: HashMap<String, GeoFence>,
    departments: HashMap<u64, String>,
    holidays: HashSet<NaiveDate>,
    attendance: HashMap<(u64, NaiveDate), AttendanceRecord>,
    manual_requests: Vec<ManualAttendanceRequest>,
}

/// Test double mirroring the MySQL backend's conflict rules.
#[derive(Default)]
pub struct InMemoryBackend {
    tables: Mutex<Tables>,
    pub schedule_loads: Mutex<usize>,
    failing_fetches: Mutex<usize>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schedule(self, schedule: ScopedSchedule) -> Self {
        self.tables.lock().unwrap().schedules.push(schedule);
        self
    }

    pub fn with_fence(self, project_code: &str, fence: GeoFence) -> Self {
        self.tables.lock().unwrap().fences.insert(project_code.to_string(), fence);
        self
    }

    pub fn with_department(self, employee_id: u64, code: &str) -> Self {
        self.tables.lock().unwrap().departments.insert(employee_id, code.to_string());
        self
    }

    pub fn with_holiday(self, date: NaiveDate) -> Self {
        self.tables.lock().unwrap().holidays.insert(date);
        self
    }

    /// Writes a record directly, as another device would.
    pub fn put_record(&self, record: AttendanceRecord) {
        self.tables
            .lock()
            .unwrap()
            .attendance
            .insert((record.employee_id, record.date), record);
    }

    pub fn record(&self, employee_id: u64, date: NaiveDate) -> Option<AttendanceRecord> {
        self.tables.lock().unwrap().attendance.get(&(employee_id, date)).cloned()
    }

    /// Makes the next `n` attendance lookups fail as if the pool timed out.
    pub fn fail_next_fetches(&self, n: usize) {
        *self.failing_fetches.lock().unwrap() = n;
    }

    pub fn manual_requests(&self) -> Vec<ManualAttendanceRequest> {
        self.tables.lock().unwrap().manual_requests.clone()
    }
}

#[async_trait]
impl AttendanceBackend for InMemoryBackend {
    async fn get_active_work_schedules(&self) -> Result<Vec<ScopedSchedule>, BackendError> {
        *self.schedule_loads.lock().unwrap() += 1;
        let tables = self.tables.lock().unwrap();
        Ok(tables.schedules.iter().filter(|s| s.is_active).cloned().collect())
    }

    async fn get_project_geofence(&self, project_code: &str) -> Result<GeoFence, BackendError> {
        self.tables
            .lock()
            .unwrap()
            .fences
            .get(project_code)
            .copied()
            .ok_or_else(|| BackendError::UnknownProject(project_code.to_string()))
    }

    async fn get_worker_department(&self, employee_id: u64) -> Result<Option<String>, BackendError> {
        Ok(self.tables.lock().unwrap().departments.get(&employee_id).cloned())
    }

    async fn is_holiday(&self, date: NaiveDate) -> Result<bool, BackendError> {
        Ok(self.tables.lock().unwrap().holidays.contains(&date))
    }

    async fn get_today_attendance(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, BackendError> {
        {
            let mut failing = self.failing_fetches.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(BackendError::Database(sqlx::Error::PoolTimedOut));
            }
        }
        Ok(self.record(employee_id, date))
    }

    async fn check_in(&self, entry: NewCheckIn) -> Result<AttendanceRecord, BackendError> {
        let mut tables = self.tables.lock().unwrap();
        let key = (entry.employee_id, entry.date);
        if tables.attendance.contains_key(&key) {
            return Err(BackendError::Conflict("already checked in today".into()));
        }
        let record = AttendanceRecord {
            employee_id: entry.employee_id,
            date: entry.date,
            project_code: entry.project_code,
            check_in: Some(entry.timestamp),
            check_out: None,
            check_in_latitude: Some(entry.position.latitude),
            check_in_longitude: Some(entry.position.longitude),
            check_out_latitude: None,
            check_out_longitude: None,
            is_holiday_work: entry.is_holiday_work,
            is_weekend_work: entry.is_weekend_work,
        };
        tables.attendance.insert(key, record.clone());
        Ok(record)
    }

    async fn check_out(&self, exit: NewCheckOut) -> Result<AttendanceRecord, BackendError> {
        let mut tables = self.tables.lock().unwrap();
        match tables.attendance.get_mut(&(exit.employee_id, exit.date)) {
            Some(record) if record.check_in.is_some() && record.check_out.is_none() => {
                record.check_out = Some(exit.timestamp);
                record.check_out_latitude = Some(exit.position.latitude);
                record.check_out_longitude = Some(exit.position.longitude);
                Ok(record.clone())
            }
            _ => Err(BackendError::Conflict("no active check-in found for today".into())),
        }
    }

    async fn submit_manual_attendance_request(
        &self,
        employee_id: u64,
        request: ValidManualRequest,
    ) -> Result<ManualAttendanceRequest, BackendError> {
        let mut tables = self.tables.lock().unwrap();
        let saved = ManualAttendanceRequest {
            id: tables.manual_requests.len() as u64 + 1,
            reference: Uuid::new_v4(),
            employee_id,
            date: request.date,
            entry_time: request.entry_time,
            exit_time: request.exit_time,
            reason: request.reason,
            status: ManualRequestStatus::Pending,
            created_at: Utc::now(),
        };
        tables.manual_requests.push(saved.clone());
        Ok(saved)
    }
}
