use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::attendance::gate::GateBlock;
use crate::attendance::manual::ValidationError;
use crate::attendance::session::SessionError;
use crate::backend::BackendError;

#[derive(Debug, Error)]
pub enum AttendanceError {
    /// The gate is closed; carries the reason shown to the worker.
    #[error("{}", .0.message())]
    Blocked(GateBlock),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// Server rejected the action; local state was reconciled to it.
    #[error("{0}")]
    SessionConflict(String),

    #[error("project {0} not found")]
    UnknownProject(String),

    #[error("no employee profile linked to this account")]
    NoEmployeeProfile,

    #[error("backend failure: {0}")]
    Backend(String),
}

impl From<BackendError> for AttendanceError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Conflict(msg) => AttendanceError::SessionConflict(msg),
            BackendError::UnknownProject(code) => AttendanceError::UnknownProject(code),
            BackendError::Database(e) => AttendanceError::Backend(e.to_string()),
        }
    }
}

/// Cache loaders share one error between all waiters.
impl From<&BackendError> for AttendanceError {
    fn from(err: &BackendError) -> Self {
        match err {
            BackendError::Conflict(msg) => AttendanceError::SessionConflict(msg.clone()),
            BackendError::UnknownProject(code) => AttendanceError::UnknownProject(code.clone()),
            BackendError::Database(e) => AttendanceError::Backend(e.to_string()),
        }
    }
}

impl AttendanceError {
    pub fn kind(&self) -> &str {
        match self {
            AttendanceError::Blocked(block) => block.as_ref(),
            AttendanceError::Validation(_) => "validation_error",
            AttendanceError::Session(_) => "submission_in_flight",
            AttendanceError::SessionConflict(_) => "session_conflict",
            AttendanceError::UnknownProject(_) => "unknown_project",
            AttendanceError::NoEmployeeProfile => "no_employee_profile",
            AttendanceError::Backend(_) => "internal_error",
        }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::Blocked(
                GateBlock::AlreadyCheckedIn | GateBlock::NotCheckedIn | GateBlock::AlreadyCheckedOut,
            ) => StatusCode::CONFLICT,
            AttendanceError::Blocked(_) => StatusCode::FORBIDDEN,
            AttendanceError::Validation(_) => StatusCode::BAD_REQUEST,
            AttendanceError::Session(_) | AttendanceError::SessionConflict(_) => StatusCode::CONFLICT,
            AttendanceError::UnknownProject(_) => StatusCode::NOT_FOUND,
            AttendanceError::NoEmployeeProfile => StatusCode::FORBIDDEN,
            AttendanceError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AttendanceError::Backend(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };
        let mut body = json!({
            "error": self.kind(),
            "message": message,
        });
        if let AttendanceError::Blocked(block) = self {
            body["manual_request_available"] = json!(block.offers_manual_request());
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}
