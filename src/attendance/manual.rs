use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ManualRequestInput {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "08:00:00", format = "time", value_type = Option<String>)]
    pub entry_time: Option<NaiveTime>,
    #[schema(example = "17:00:00", format = "time", value_type = Option<String>)]
    pub exit_time: Option<NaiveTime>,
    #[serde(default)]
    #[schema(example = "GPS unavailable on site")]
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("reason must not be empty")]
    MissingReason,
    #[error("entry time is required")]
    MissingEntryTime,
    #[error("exit time must be after entry time")]
    ExitNotAfterEntry,
    #[error("requests cannot be dated in the future")]
    FutureDate,
}

/// A request that passed validation and may be sent for approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidManualRequest {
    pub date: NaiveDate,
    pub entry_time: NaiveTime,
    pub exit_time: Option<NaiveTime>,
    pub reason: String,
}

/// Checks a manual request before it ever reaches the backend. `today` is
/// the worker's local date.
pub fn validate(input: &ManualRequestInput, today: NaiveDate) -> Result<ValidManualRequest, ValidationError> {
    let reason = input.reason.trim();
    if reason.is_empty() {
        return Err(ValidationError::MissingReason);
    }

    let entry_time = input.entry_time.ok_or(ValidationError::MissingEntryTime)?;

    if let Some(exit) = input.exit_time {
        if exit <= entry_time {
            return Err(ValidationError::ExitNotAfterEntry);
        }
    }

    if input.date > today {
        return Err(ValidationError::FutureDate);
    }

    Ok(ValidManualRequest {
        date: input.date,
        entry_time,
        exit_time: input.exit_time,
        reason: reason.to_string(),
    })
}
