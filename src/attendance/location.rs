use chrono::{DateTime, Duration, Utc};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use strum::Display;
use utoipa::ToSchema;

use crate::model::geofence::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LocationErrorKind {
    /// Terminal until the user changes device settings.
    PermissionDenied,
    /// No fix yet, or the provider timed out. Retried by the stream.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub position: Coordinate,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationEvent {
    Fix(LocationFix),
    Error(LocationErrorKind),
}

/// What the gate sees: the latest usable position and the latest error.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocationSnapshot {
    pub position: Option<Coordinate>,
    pub error: Option<LocationErrorKind>,
}

impl LocationSnapshot {
    pub fn at(position: Coordinate) -> Self {
        Self {
            position: Some(position),
            error: None,
        }
    }

    pub fn failed(kind: LocationErrorKind) -> Self {
        Self {
            position: None,
            error: Some(kind),
        }
    }
}

/// Holds the latest fix and error reported by a location provider.
///
/// A fresh fix clears any previous error; an error keeps the last fix
/// around but the snapshot still reports the error so gates stay closed.
#[derive(Debug, Clone)]
pub struct LocationTracker {
    max_age: Duration,
    last_fix: Option<LocationFix>,
    last_error: Option<LocationErrorKind>,
}

impl LocationTracker {
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            last_fix: None,
            last_error: None,
        }
    }

    pub fn apply(&mut self, event: LocationEvent) {
        match event {
            LocationEvent::Fix(fix) => {
                self.last_fix = Some(fix);
                self.last_error = None;
            }
            LocationEvent::Error(kind) => self.last_error = Some(kind),
        }
    }

    /// Fixes older than `max_age` (or from the future) are never reused;
    /// they read as unavailable.
    pub fn snapshot(&self, now: DateTime<Utc>) -> LocationSnapshot {
        if let Some(kind) = self.last_error {
            return LocationSnapshot::failed(kind);
        }
        match self.last_fix {
            Some(fix) if is_fresh(fix.recorded_at, now, self.max_age) => {
                LocationSnapshot::at(fix.position)
            }
            _ => LocationSnapshot::failed(LocationErrorKind::Unavailable),
        }
    }

    /// Drains a provider stream into the tracker, invoking `on_update`
    /// after every event. Ends when the stream ends; wrap the future in
    /// `futures::future::Abortable` to cancel the subscription.
    pub async fn follow<S, F>(&mut self, events: S, mut on_update: F)
    where
        S: Stream<Item = LocationEvent>,
        F: FnMut(&LocationTracker),
    {
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            self.apply(event);
            on_update(self);
        }
    }
}

fn is_fresh(recorded_at: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    let age = now - recorded_at;
    age >= Duration::zero() && age <= max_age
}
