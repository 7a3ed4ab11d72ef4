use crate::attendance::location::LocationErrorKind;
use crate::attendance::manual::ManualRequestInput;
use crate::attendance::service::{AttendanceService, LocationReport};
use crate::auth::auth::AuthUser;
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    /// Project whose site and schedule apply (ignored once checked in)
    #[param(example = "PRJ-001")]
    pub project_code: String,
    /// Latest latitude from the device
    #[param(example = 23.8103)]
    pub latitude: Option<f64>,
    /// Latest longitude from the device
    #[param(example = 90.4125)]
    pub longitude: Option<f64>,
    /// When the fix was taken
    #[param(value_type = Option<String>)]
    pub recorded_at: Option<DateTime<Utc>>,
    /// Location provider error, if any
    pub location_error: Option<LocationErrorKind>,
}

impl StatusQuery {
    fn location(&self) -> LocationReport {
        LocationReport {
            latitude: self.latitude,
            longitude: self.longitude,
            recorded_at: self.recorded_at,
            error: self.location_error,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CheckInRequest {
    #[schema(example = "PRJ-001")]
    pub project_code: String,
    pub location: LocationReport,
}

#[derive(Deserialize, ToSchema)]
pub struct CheckOutRequest {
    pub location: LocationReport,
}

/// Gate and schedule status for the caller's current location
#[utoipa::path(
    get,
    path = "/api/attendance/status",
    params(StatusQuery),
    responses(
        (status = 200, description = "Current attendance status", body = AttendanceStatus),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 404, description = "Unknown project"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn status(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    query: web::Query<StatusQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.worker_id()?;
    let status = service
        .status(employee_id, &query.project_code, &query.location())
        .await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Today's attendance record
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's record and derived state", body = TodayAttendance),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.worker_id()?;
    let today = service.today_attendance(employee_id).await?;
    Ok(HttpResponse::Ok().json(today))
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = CheckInRequest,
    responses(
        (status = 200, description = "Checked in successfully", body = AttendanceOutcome),
        (status = 400, description = "Malformed request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Blocked by location, geofence or schedule window", body = Object, example = json!({
            "error": "out_of_geofence",
            "message": "You are outside the project site range",
            "manual_request_available": true
        })),
        (status = 409, description = "Already checked in, or a submission is in flight", body = Object, example = json!({
            "error": "already_checked_in",
            "message": "Already checked in today",
            "manual_request_available": false
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: web::Json<CheckInRequest>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.worker_id()?;
    let outcome = service
        .check_in(employee_id, &payload.project_code, &payload.location)
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Check-out endpoint
#[utoipa::path(
    put,
    path = "/api/attendance",
    request_body = CheckOutRequest,
    responses(
        (status = 200, description = "Checked out successfully", body = AttendanceOutcome),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Blocked by location or geofence"),
        (status = 409, description = "No active check-in found for today", body = Object, example = json!({
            "error": "not_checked_in",
            "message": "No active check-in found for today",
            "manual_request_available": false
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: web::Json<CheckOutRequest>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.worker_id()?;
    let outcome = service.check_out(employee_id, &payload.location).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Manual attendance request for when live gating fails
#[utoipa::path(
    post,
    path = "/api/attendance/manual-request",
    request_body = ManualRequestInput,
    responses(
        (status = 201, description = "Request submitted for approval", body = ManualAttendanceRequest),
        (status = 400, description = "Validation failed", body = Object, example = json!({
            "error": "validation_error",
            "message": "exit time must be after entry time"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "A request is already being submitted")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn submit_manual_request(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: web::Json<ManualRequestInput>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.worker_id()?;
    let saved = service.submit_manual_request(employee_id, &payload).await?;
    Ok(HttpResponse::Created().json(saved))
}

#[cfg(test)]
mod tests {
    use crate::attendance::clock::testing::FixedClock;
    use crate::attendance::service::tests::{EMPLOYEE, PROJECT, SITE, at, backend, service};
    use crate::auth::jwt::testing::{SECRET, token};
    use crate::config::Config;
    use crate::models::TokenType;
    use crate::routes;
    use actix_web::{App, http::StatusCode, test, web::Data};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn config() -> Config {
        Config {
            database_url: String::new(),
            jwt_secret: SECRET.into(),
            server_addr: "127.0.0.1:0".into(),
            api_prefix: "/api".into(),
            rate_attendance_per_min: 1_000,
            timezone: chrono_tz::UTC,
            weekend_days: vec![],
            location_max_age_secs: 60,
            geofence_cache_ttl_secs: 300,
            log_level: tracing::Level::DEBUG,
        }
    }

    macro_rules! app {
        ($now:expr) => {{
            let config = config();
            let svc = service(backend(), Arc::new(FixedClock::new($now)));
            test::init_service(
                App::new()
                    .app_data(Data::new(config.clone()))
                    .app_data(Data::new(svc))
                    .configure(|cfg| routes::configure(cfg, config.clone())),
            )
            .await
        }};
    }

    fn bearer() -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", token(Some(EMPLOYEE), TokenType::Access)))
    }

    #[actix_web::test]
    async fn missing_token_is_unauthorized() {
        let app = app!(at(3, 8, 5));
        let req = test::TestRequest::get()
            .uri("/api/attendance/today")
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn account_without_employee_profile_is_forbidden() {
        let app = app!(at(3, 8, 5));
        let req = test::TestRequest::get()
            .uri("/api/attendance/today")
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .insert_header((
                "Authorization",
                format!("Bearer {}", token(None, TokenType::Access)),
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn status_then_check_in_over_http() {
        let app = app!(at(3, 8, 5));

        let req = test::TestRequest::get()
            .uri(&format!(
                "/api/attendance/status?project_code={PROJECT}&latitude={}&longitude={}",
                SITE.latitude, SITE.longitude
            ))
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .insert_header(bearer())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["can_check_in"], json!(true));
        assert_eq!(body["status_label"], json!("5 minutes late"));
        assert_eq!(body["clock"]["direction"], json!("LATE"));

        let req = test::TestRequest::post()
            .uri("/api/attendance")
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .insert_header(bearer())
            .set_json(json!({
                "project_code": PROJECT,
                "location": { "latitude": SITE.latitude, "longitude": SITE.longitude }
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["state"], json!("CHECKED_IN"));
        assert_eq!(body["status_label"], json!("On time"));

        let req = test::TestRequest::post()
            .uri("/api/attendance")
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .insert_header(bearer())
            .set_json(json!({
                "project_code": PROJECT,
                "location": { "latitude": SITE.latitude, "longitude": SITE.longitude }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn permission_denied_check_in_is_forbidden_with_distinct_kind() {
        let app = app!(at(3, 8, 5));
        let req = test::TestRequest::post()
            .uri("/api/attendance")
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .insert_header(bearer())
            .set_json(json!({
                "project_code": PROJECT,
                "location": { "error": "permission_denied" }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], json!("location_permission_denied"));
        assert_eq!(body["manual_request_available"], json!(true));
    }

    #[actix_web::test]
    async fn manual_request_validation_is_a_bad_request() {
        let app = app!(at(3, 12, 0));
        let req = test::TestRequest::post()
            .uri("/api/attendance/manual-request")
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .insert_header(bearer())
            .set_json(json!({
                "date": "2026-08-03",
                "entry_time": "08:00:00",
                "exit_time": "08:00:00",
                "reason": "GPS down"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/attendance/manual-request")
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .insert_header(bearer())
            .set_json(json!({
                "date": "2026-08-03",
                "entry_time": "08:00:00",
                "reason": "GPS down"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
}
