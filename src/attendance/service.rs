use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use crate::attendance::clock::{Clock, local_date};
use crate::attendance::gate::{self, FenceCheck, GateBlock};
use crate::attendance::location::{
    LocationErrorKind, LocationEvent, LocationFix, LocationSnapshot, LocationTracker,
};
use crate::attendance::manual::{self, ManualRequestInput};
use crate::attendance::schedule_clock::{self, ClockReading};
use crate::attendance::schedule_resolver::{self, ResolvedSchedule};
use crate::attendance::session::{Action, AttendanceSession, Settled, Ticket};
use crate::backend::{AttendanceBackend, BackendError, NewCheckIn, NewCheckOut};
use crate::error::AttendanceError;
use crate::model::attendance::{AttendanceRecord, SessionState};
use crate::model::geofence::{Coordinate, GeoFence};
use crate::model::manual_request::ManualAttendanceRequest;
use crate::model::schedule::ScopedSchedule;

type SharedSession = Arc<Mutex<AttendanceSession>>;

#[derive(Debug, Clone)]
pub struct AttendanceSettings {
    pub timezone: Tz,
    pub weekend_days: Vec<Weekday>,
    pub location_max_age: Duration,
    pub geofence_cache_ttl: StdDuration,
}

/// Location as reported by the device alongside a request: either a fix
/// or the provider's error.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LocationReport {
    #[schema(example = 23.8103)]
    pub latitude: Option<f64>,
    #[schema(example = 90.4125)]
    pub longitude: Option<f64>,
    /// When the fix was taken; defaults to the time of the request.
    #[schema(example = "2026-01-01T02:05:00Z", format = "date-time", value_type = Option<String>)]
    pub recorded_at: Option<DateTime<Utc>>,
    pub error: Option<LocationErrorKind>,
}

impl LocationReport {
    fn events(&self, now: DateTime<Utc>) -> Vec<LocationEvent> {
        let mut events = Vec::with_capacity(2);
        if let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) {
            events.push(LocationEvent::Fix(LocationFix {
                position: Coordinate::new(latitude, longitude),
                recorded_at: self.recorded_at.unwrap_or(now),
            }));
        }
        if let Some(kind) = self.error {
            events.push(LocationEvent::Error(kind));
        }
        events
    }

    /// Replays the report through a tracker: the fix first, then any
    /// provider error.
    pub async fn snapshot(&self, now: DateTime<Utc>, max_age: Duration) -> LocationSnapshot {
        let mut tracker = LocationTracker::new(max_age);
        tracker
            .follow(futures::stream::iter(self.events(now)), |_| {})
            .await;
        tracker.snapshot(now)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceStatus {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub state: SessionState,
    #[schema(example = "PRJ-001")]
    pub project_code: String,
    pub schedule: ResolvedSchedule,
    pub clock: ClockReading,
    #[schema(example = "5 minutes late")]
    pub status_label: String,
    pub is_after_scheduled_end: bool,
    pub fence: FenceCheck,
    #[schema(example = 100.0)]
    pub radius_meters: f64,
    pub can_check_in: bool,
    pub can_check_out: bool,
    pub check_in_block: Option<GateBlock>,
    pub check_out_block: Option<GateBlock>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TodayAttendance {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub state: SessionState,
    pub record: Option<AttendanceRecord>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceOutcome {
    pub record: AttendanceRecord,
    pub state: SessionState,
    pub clock: ClockReading,
    #[schema(example = "On time")]
    pub status_label: String,
}

fn lock(session: &Mutex<AttendanceSession>) -> MutexGuard<'_, AttendanceSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The record the worker's session should track on `today`: today's, or
/// yesterday's while its overnight check-in is still open.
async fn current_record(
    backend: &dyn AttendanceBackend,
    employee_id: u64,
    today: NaiveDate,
) -> Result<Option<AttendanceRecord>, BackendError> {
    if let Some(record) = backend.get_today_attendance(employee_id, today).await? {
        return Ok(Some(record));
    }
    let Some(yesterday) = today.pred_opt() else {
        return Ok(None);
    };
    Ok(backend
        .get_today_attendance(employee_id, yesterday)
        .await?
        .filter(|r| r.state() == SessionState::CheckedIn))
}

/// Evaluates and performs attendance actions for authenticated workers.
///
/// Schedules are fetched once per local date and geofences once per TTL;
/// sessions are kept per worker so in-flight submissions are visible
/// across requests.
pub struct AttendanceService {
    backend: Arc<dyn AttendanceBackend>,
    clock: Arc<dyn Clock>,
    settings: AttendanceSettings,
    schedules: Cache<NaiveDate, Arc<Vec<ScopedSchedule>>>,
    fences: Cache<String, GeoFence>,
    sessions: Cache<u64, SharedSession>,
}

impl AttendanceService {
    pub fn new(
        backend: Arc<dyn AttendanceBackend>,
        clock: Arc<dyn Clock>,
        settings: AttendanceSettings,
    ) -> Self {
        let schedules = Cache::builder()
            .max_capacity(4)
            .time_to_live(StdDuration::from_secs(86_400))
            .build();
        let fences = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(settings.geofence_cache_ttl)
            .build();
        let sessions = Cache::builder()
            .max_capacity(500_000)
            .time_to_idle(StdDuration::from_secs(36 * 3_600))
            .build();

        Self {
            backend,
            clock,
            settings,
            schedules,
            fences,
            sessions,
        }
    }

    fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        local_date(now, self.settings.timezone)
    }

    async fn session(&self, employee_id: u64, today: NaiveDate) -> Result<SharedSession, AttendanceError> {
        let backend = self.backend.clone();
        let session = self
            .sessions
            .try_get_with(employee_id, async move {
                let record = current_record(backend.as_ref(), employee_id, today).await?;
                Ok::<_, BackendError>(Arc::new(Mutex::new(AttendanceSession::new(
                    employee_id,
                    today,
                    record,
                ))))
            })
            .await
            .map_err(|e| AttendanceError::from(e.as_ref()))?;

        let needs_roll_over = lock(&session).needs_roll_over(today);
        if needs_roll_over {
            let record = current_record(self.backend.as_ref(), employee_id, today).await?;
            let mut s = lock(&session);
            if s.needs_roll_over(today) {
                s.roll_over(today, record);
            }
        }
        Ok(session)
    }

    async fn resolve_schedule(
        &self,
        employee_id: u64,
        project_code: &str,
        today: NaiveDate,
    ) -> Result<ResolvedSchedule, AttendanceError> {
        let backend = self.backend.clone();
        let candidates = self
            .schedules
            .try_get_with(today, async move {
                backend.get_active_work_schedules().await.map(Arc::new)
            })
            .await
            .map_err(|e| AttendanceError::from(e.as_ref()))?;

        let department = self.backend.get_worker_department(employee_id).await?;
        Ok(schedule_resolver::resolve(
            Some(project_code),
            department.as_deref(),
            &candidates,
        ))
    }

    async fn fence(&self, project_code: &str) -> Result<GeoFence, AttendanceError> {
        let backend = self.backend.clone();
        let code = project_code.to_string();
        self.fences
            .try_get_with(project_code.to_string(), async move {
                backend.get_project_geofence(&code).await
            })
            .await
            .map_err(|e| AttendanceError::from(e.as_ref()))
    }

    /// Refetches today's record after the backend disagreed with us.
    async fn reconcile_after_conflict(&self, session: &SharedSession, employee_id: u64, today: NaiveDate) {
        match current_record(self.backend.as_ref(), employee_id, today).await {
            Ok(record) => lock(session).reconcile(today, record),
            Err(e) => error!(error = %e, employee_id, "Failed to refetch attendance after conflict"),
        }
    }

    async fn settle_transition(
        &self,
        session: &SharedSession,
        ticket: Ticket,
        result: Result<AttendanceRecord, BackendError>,
        employee_id: u64,
        today: NaiveDate,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let action = ticket.action();
        match result {
            Ok(record) => {
                let settled = lock(session).complete(ticket, record.clone());
                match settled {
                    Settled::Applied(state) => {
                        info!(employee_id, %action, %state, "Attendance transition applied");
                        Ok(record)
                    }
                    Settled::Discarded => {
                        self.reconcile_after_conflict(session, employee_id, today).await;
                        Err(AttendanceError::SessionConflict(format!(
                            "attendance changed while {action} was in flight"
                        )))
                    }
                }
            }
            Err(BackendError::Conflict(msg)) => {
                lock(session).release(ticket);
                warn!(employee_id, %action, reason = %msg, "Backend rejected attendance action");
                self.reconcile_after_conflict(session, employee_id, today).await;
                Err(AttendanceError::SessionConflict(msg))
            }
            Err(e) => {
                lock(session).release(ticket);
                error!(error = %e, employee_id, %action, "Attendance submission failed");
                Err(e.into())
            }
        }
    }

    /// Gate and clock evaluation for the reported location. Never changes
    /// any state.
    #[instrument(name = "attendance_status", skip(self, report))]
    pub async fn status(
        &self,
        employee_id: u64,
        project_code: &str,
        report: &LocationReport,
    ) -> Result<AttendanceStatus, AttendanceError> {
        let now = self.clock.now();
        let today = self.today(now);
        let tz = self.settings.timezone;

        let session = self.session(employee_id, today).await?;
        let (state, record) = {
            let s = lock(&session);
            (s.state(), s.record().cloned())
        };
        let project_code = record
            .as_ref()
            .map_or(project_code, |r| r.project_code.as_str())
            .to_string();

        let schedule = self.resolve_schedule(employee_id, &project_code, today).await?;
        let fence = self.fence(&project_code).await?;
        let location = report.snapshot(now, self.settings.location_max_age).await;

        let clock = schedule_clock::evaluate(
            &schedule.schedule,
            now,
            tz,
            record.as_ref().and_then(|r| r.check_in),
        );
        let after_end = schedule_clock::is_after_scheduled_end(&schedule.schedule, now, tz);
        let check_in_block = gate::check_in_block(&location, &fence, after_end, state);
        let check_out_block = gate::check_out_block(&location, &fence, state);

        Ok(AttendanceStatus {
            date: today,
            state,
            project_code,
            schedule,
            status_label: clock.label(),
            clock,
            is_after_scheduled_end: after_end,
            fence: gate::check_fence(location.position, &fence),
            radius_meters: fence.radius_meters,
            can_check_in: gate::can_check_in(&location, &fence, after_end, state),
            can_check_out: gate::can_check_out(&location, &fence, state),
            check_in_block,
            check_out_block,
        })
    }

    #[instrument(name = "attendance_today", skip(self))]
    pub async fn today_attendance(&self, employee_id: u64) -> Result<TodayAttendance, AttendanceError> {
        let today = self.today(self.clock.now());
        let session = self.session(employee_id, today).await?;
        let s = lock(&session);
        Ok(TodayAttendance {
            date: s.date(),
            state: s.state(),
            record: s.record().cloned(),
        })
    }

    #[instrument(name = "attendance_check_in", skip(self, report))]
    pub async fn check_in(
        &self,
        employee_id: u64,
        project_code: &str,
        report: &LocationReport,
    ) -> Result<AttendanceOutcome, AttendanceError> {
        let now = self.clock.now();
        let today = self.today(now);
        let tz = self.settings.timezone;

        let session = self.session(employee_id, today).await?;
        let schedule = self.resolve_schedule(employee_id, project_code, today).await?;
        let fence = self.fence(project_code).await?;
        let location = report.snapshot(now, self.settings.location_max_age).await;
        let after_end = schedule_clock::is_after_scheduled_end(&schedule.schedule, now, tz);
        let is_holiday_work = self.backend.is_holiday(today).await?;
        let is_weekend_work = self.settings.weekend_days.contains(&today.weekday());

        let (ticket, position) = {
            let mut s = lock(&session);
            if let Some(block) = gate::check_in_block(&location, &fence, after_end, s.state()) {
                warn!(employee_id, %block, "Check-in blocked");
                return Err(AttendanceError::Blocked(block));
            }
            let position = location
                .position
                .ok_or(AttendanceError::Blocked(GateBlock::LocationUnavailable))?;
            (s.begin(Action::CheckIn)?, position)
        };

        let result = self
            .backend
            .check_in(NewCheckIn {
                employee_id,
                date: today,
                project_code: project_code.to_string(),
                position,
                timestamp: now,
                is_holiday_work,
                is_weekend_work,
            })
            .await;

        let record = self
            .settle_transition(&session, ticket, result, employee_id, today)
            .await?;
        let clock = schedule_clock::evaluate(&schedule.schedule, now, tz, record.check_in);
        Ok(AttendanceOutcome {
            state: record.state(),
            status_label: clock.label(),
            clock,
            record,
        })
    }

    #[instrument(name = "attendance_check_out", skip(self, report))]
    pub async fn check_out(
        &self,
        employee_id: u64,
        report: &LocationReport,
    ) -> Result<AttendanceOutcome, AttendanceError> {
        let now = self.clock.now();
        let today = self.today(now);
        let tz = self.settings.timezone;

        let session = self.session(employee_id, today).await?;
        // an overnight shift is checked out against the date it started on
        let (state, project_code, day) = {
            let s = lock(&session);
            (s.state(), s.record().map(|r| r.project_code.clone()), s.date())
        };
        let Some(project_code) = project_code else {
            return Err(AttendanceError::Blocked(GateBlock::NotCheckedIn));
        };
        if state.has_checked_out() {
            return Err(AttendanceError::Blocked(GateBlock::AlreadyCheckedOut));
        }

        let schedule = self.resolve_schedule(employee_id, &project_code, today).await?;
        let fence = self.fence(&project_code).await?;
        let location = report.snapshot(now, self.settings.location_max_age).await;

        let (ticket, position) = {
            let mut s = lock(&session);
            if let Some(block) = gate::check_out_block(&location, &fence, s.state()) {
                warn!(employee_id, %block, "Check-out blocked");
                return Err(AttendanceError::Blocked(block));
            }
            let position = location
                .position
                .ok_or(AttendanceError::Blocked(GateBlock::LocationUnavailable))?;
            (s.begin(Action::CheckOut)?, position)
        };

        let result = self
            .backend
            .check_out(NewCheckOut {
                employee_id,
                date: day,
                position,
                timestamp: now,
            })
            .await;

        let record = self
            .settle_transition(&session, ticket, result, employee_id, today)
            .await?;
        let clock = schedule_clock::evaluate(&schedule.schedule, now, tz, record.check_in);
        Ok(AttendanceOutcome {
            state: record.state(),
            status_label: clock.label(),
            clock,
            record,
        })
    }

    /// Always available, whatever the session state. Invalid requests are
    /// rejected here and never reach the backend.
    #[instrument(name = "attendance_manual_request", skip(self, input))]
    pub async fn submit_manual_request(
        &self,
        employee_id: u64,
        input: &ManualRequestInput,
    ) -> Result<ManualAttendanceRequest, AttendanceError> {
        let today = self.today(self.clock.now());
        let request = manual::validate(input, today).inspect_err(|e| {
            warn!(employee_id, error = %e, "Manual attendance request rejected");
        })?;

        let session = self.session(employee_id, today).await?;
        let ticket = lock(&session).begin(Action::ManualRequest)?;

        let result = self
            .backend
            .submit_manual_attendance_request(employee_id, request)
            .await;
        lock(&session).release(ticket);

        match result {
            Ok(saved) => {
                info!(employee_id, request_id = saved.id, reference = %saved.reference, "Manual attendance request submitted");
                Ok(saved)
            }
            Err(e) => {
                error!(error = %e, employee_id, "Manual attendance request failed");
                Err(e.into())
            }
        }
    }
}
