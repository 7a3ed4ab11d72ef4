use crate::api::attendance::{CheckInRequest, CheckOutRequest};
use crate::attendance::gate::{FenceCheck, GateBlock};
use crate::attendance::location::LocationErrorKind;
use crate::attendance::manual::ManualRequestInput;
use crate::attendance::schedule_clock::{ClockReading, Direction};
use crate::attendance::schedule_resolver::{ResolvedSchedule, ScheduleSource};
use crate::attendance::service::{
    AttendanceOutcome, AttendanceStatus, LocationReport, TodayAttendance,
};
use crate::model::attendance::{AttendanceRecord, SessionState};
use crate::model::manual_request::{ManualAttendanceRequest, ManualRequestStatus};
use crate::model::schedule::WorkSchedule;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Attendance API",
        version = "1.0.0",
        description = r#"
## Geofenced Attendance

Workers check in and out of their assigned project site. Each action is gated on:

- **Location**: a fresh device fix, with permission granted
- **Geofence**: distance to the project site within its radius (100 m by default)
- **Schedule**: check-in closes once the resolved work schedule has ended
- **Session state**: one check-in and one check-out per local date

When a gate stays closed the worker can file a **manual attendance request** for HR approval.

Schedules resolve by project, then department, then the organisation default,
falling back to 08:00 to 17:00. Arrival within 15 minutes of the start counts as on time.

### 🔐 Security
All endpoints require a **JWT Bearer** access token carrying the worker's employee id.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::status,
        crate::api::attendance::today,
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::submit_manual_request
    ),
    components(
        schemas(
            AttendanceStatus,
            TodayAttendance,
            AttendanceOutcome,
            AttendanceRecord,
            SessionState,
            LocationReport,
            LocationErrorKind,
            CheckInRequest,
            CheckOutRequest,
            ManualRequestInput,
            ManualAttendanceRequest,
            ManualRequestStatus,
            ResolvedSchedule,
            ScheduleSource,
            WorkSchedule,
            ClockReading,
            Direction,
            FenceCheck,
            GateBlock
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Geofenced check-in, check-out and manual requests"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_attendance_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/attendance",
            "/api/attendance/status",
            "/api/attendance/today",
            "/api/attendance/manual-request",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let schemes = &doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
