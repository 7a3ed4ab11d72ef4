use crate::error::AttendanceError;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

/// Caller identity placed in request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(ErrorUnauthorized("Missing token"))),
        }
    }
}

impl AuthUser {
    /// Attendance is tracked per employee; accounts without a profile
    /// (system users, API users) cannot check in.
    pub fn worker_id(&self) -> Result<u64, AttendanceError> {
        self.employee_id.ok_or(AttendanceError::NoEmployeeProfile)
    }
}
