use std::collections::HashMap;

use chrono::NaiveDate;
use strum::Display;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::attendance::{AttendanceRecord, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    CheckIn,
    CheckOut,
    ManualRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a {0} submission is already in progress")]
    SubmissionInFlight(Action),
}

/// Proof that a submission was started. Settle it with
/// [`AttendanceSession::complete`] or [`AttendanceSession::release`].
#[derive(Debug)]
#[must_use]
pub struct Ticket {
    id: u64,
    action: Action,
    generation: u64,
}

impl Ticket {
    pub fn action(&self) -> Action {
        self.action
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Applied(SessionState),
    /// The session moved on while the call was in flight.
    Discarded,
}

/// One worker's attendance day.
///
/// The state is linear (not checked in → checked in → checked out) and
/// resets when the local date rolls over, unless an overnight check-in is
/// still open. Backend calls happen
/// outside the session: `begin` hands out a ticket, the caller performs the
/// call, and `complete`/`release` settle it. Every applied change bumps
/// the generation so results from superseded tickets are dropped.
#[derive(Debug)]
pub struct AttendanceSession {
    employee_id: u64,
    date: NaiveDate,
    record: Option<AttendanceRecord>,
    generation: u64,
    next_ticket: u64,
    in_flight: HashMap<Action, u64>,
}

/// A check-in from the previous date that is still open belongs to a
/// midnight-crossing shift and stays current until it is checked out.
fn carries_into(record: &AttendanceRecord, today: NaiveDate) -> bool {
    record.state() == SessionState::CheckedIn && record.date.succ_opt() == Some(today)
}

/// The attendance day a record puts the session on, given the local date.
fn adopt(today: NaiveDate, record: Option<AttendanceRecord>) -> (NaiveDate, Option<AttendanceRecord>) {
    match record {
        Some(r) if r.date == today => (today, Some(r)),
        Some(r) if carries_into(&r, today) => (r.date, Some(r)),
        _ => (today, None),
    }
}

impl AttendanceSession {
    pub fn new(employee_id: u64, today: NaiveDate, record: Option<AttendanceRecord>) -> Self {
        let (date, record) = adopt(today, record);
        Self {
            employee_id,
            date,
            record,
            generation: 0,
            next_ticket: 0,
            in_flight: HashMap::new(),
        }
    }

    /// The attendance day being tracked. Lags the local date while an
    /// overnight check-in is open.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn record(&self) -> Option<&AttendanceRecord> {
        self.record.as_ref()
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_record(self.record.as_ref())
    }

    #[cfg(test)]
    pub fn is_in_flight(&self, action: Action) -> bool {
        self.in_flight.contains_key(&action)
    }

    /// Whether `today` starts a new attendance day. An open check-in from
    /// the previous date keeps the current one.
    pub fn needs_roll_over(&self, today: NaiveDate) -> bool {
        if today == self.date {
            return false;
        }
        !self.record.as_ref().is_some_and(|r| carries_into(r, today))
    }

    /// Moves to `today` and adopts the backend's record for it in one step,
    /// so a failed fetch leaves the previous day in place.
    pub fn roll_over(&mut self, today: NaiveDate, record: Option<AttendanceRecord>) {
        debug!(employee_id = self.employee_id, from = %self.date, to = %today, "Attendance day rolled over");
        let (date, record) = adopt(today, record);
        self.date = date;
        self.record = record;
        self.in_flight.clear();
        self.generation += 1;
    }

    /// Adopts the backend's view of the current day, e.g. after a conflict.
    pub fn reconcile(&mut self, today: NaiveDate, record: Option<AttendanceRecord>) {
        let (date, record) = adopt(today, record);
        self.date = date;
        self.record = record;
        self.generation += 1;
    }

    /// At most one submission per action may be outstanding.
    pub fn begin(&mut self, action: Action) -> Result<Ticket, SessionError> {
        if self.in_flight.contains_key(&action) {
            return Err(SessionError::SubmissionInFlight(action));
        }
        self.next_ticket += 1;
        let id = self.next_ticket;
        self.in_flight.insert(action, id);
        Ok(Ticket {
            id,
            action,
            generation: self.generation,
        })
    }

    /// Applies a successful backend result unless the session has moved on
    /// or the result would not advance the state.
    pub fn complete(&mut self, ticket: Ticket, record: AttendanceRecord) -> Settled {
        let current_generation = self.generation;
        self.settle(&ticket);

        let advances = record.date == self.date && record.state() > self.state();
        if ticket.generation != current_generation || !advances {
            warn!(
                employee_id = self.employee_id,
                action = %ticket.action,
                "Discarding stale attendance result"
            );
            return Settled::Discarded;
        }

        self.record = Some(record);
        self.generation += 1;
        Settled::Applied(self.state())
    }

    /// Ends a submission without touching the state (failure, or a manual
    /// request which never changes it).
    pub fn release(&mut self, ticket: Ticket) {
        self.settle(&ticket);
    }

    fn settle(&mut self, ticket: &Ticket) {
        if self.in_flight.get(&ticket.action) == Some(&ticket.id) {
            self.in_flight.remove(&ticket.action);
        }
    }
}
