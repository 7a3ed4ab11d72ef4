use serde::Serialize;
use strum::{AsRefStr, Display};
use utoipa::ToSchema;

use crate::attendance::geo::distance_meters;
use crate::attendance::location::{LocationErrorKind, LocationSnapshot};
use crate::model::attendance::SessionState;
use crate::model::geofence::{Coordinate, GeoFence};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct FenceCheck {
    /// `None` while the position is unknown or the distance is NaN.
    pub distance_meters: Option<f64>,
    pub within_fence: bool,
}

/// Why an action is currently unavailable. These are states to show the
/// worker, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GateBlock {
    LocationUnavailable,
    LocationPermissionDenied,
    OutOfGeofence,
    ScheduleWindowClosed,
    AlreadyCheckedIn,
    NotCheckedIn,
    AlreadyCheckedOut,
}

impl GateBlock {
    pub fn message(&self) -> &'static str {
        match self {
            GateBlock::LocationUnavailable => "Locating… no position fix yet",
            GateBlock::LocationPermissionDenied => {
                "Location permission denied. Enable location access in your device settings"
            }
            GateBlock::OutOfGeofence => "You are outside the project site range",
            GateBlock::ScheduleWindowClosed => {
                "The scheduled work window has ended. Submit a manual attendance request instead"
            }
            GateBlock::AlreadyCheckedIn => "Already checked in today",
            GateBlock::NotCheckedIn => "No active check-in found for today",
            GateBlock::AlreadyCheckedOut => "Already checked out today",
        }
    }

    /// Location and schedule blocks point the worker at the manual path.
    pub fn offers_manual_request(&self) -> bool {
        !matches!(
            self,
            GateBlock::AlreadyCheckedIn | GateBlock::NotCheckedIn | GateBlock::AlreadyCheckedOut
        )
    }
}

/// Inclusive boundary. Unknown position, NaN distance or an unusable
/// radius all fail closed.
pub fn check_fence(position: Option<Coordinate>, fence: &GeoFence) -> FenceCheck {
    let distance = position
        .map(|p| distance_meters(p, fence.center))
        .filter(|d| !d.is_nan());

    let within_fence = match distance {
        Some(d) => fence.is_usable() && d <= fence.radius_meters,
        None => false,
    };

    FenceCheck {
        distance_meters: distance,
        within_fence,
    }
}

fn location_block(location: &LocationSnapshot) -> Option<GateBlock> {
    match location.error {
        Some(LocationErrorKind::PermissionDenied) => Some(GateBlock::LocationPermissionDenied),
        Some(LocationErrorKind::Unavailable) => Some(GateBlock::LocationUnavailable),
        None if location.position.is_none() => Some(GateBlock::LocationUnavailable),
        None => None,
    }
}

/// First reason check-in is closed, or `None` when it is open.
pub fn check_in_block(
    location: &LocationSnapshot,
    fence: &GeoFence,
    is_after_scheduled_end: bool,
    state: SessionState,
) -> Option<GateBlock> {
    if state.has_checked_in() {
        return Some(GateBlock::AlreadyCheckedIn);
    }
    if let Some(block) = location_block(location) {
        return Some(block);
    }
    if !check_fence(location.position, fence).within_fence {
        return Some(GateBlock::OutOfGeofence);
    }
    if is_after_scheduled_end {
        return Some(GateBlock::ScheduleWindowClosed);
    }
    None
}

/// First reason check-out is closed, or `None` when it is open.
pub fn check_out_block(
    location: &LocationSnapshot,
    fence: &GeoFence,
    state: SessionState,
) -> Option<GateBlock> {
    match state {
        SessionState::NotCheckedIn => return Some(GateBlock::NotCheckedIn),
        SessionState::CheckedOut => return Some(GateBlock::AlreadyCheckedOut),
        SessionState::CheckedIn => {}
    }
    if let Some(block) = location_block(location) {
        return Some(block);
    }
    if !check_fence(location.position, fence).within_fence {
        return Some(GateBlock::OutOfGeofence);
    }
    None
}

pub fn can_check_in(
    location: &LocationSnapshot,
    fence: &GeoFence,
    is_after_scheduled_end: bool,
    state: SessionState,
) -> bool {
    check_in_block(location, fence, is_after_scheduled_end, state).is_none()
}

pub fn can_check_out(location: &LocationSnapshot, fence: &GeoFence, state: SessionState) -> bool {
    check_out_block(location, fence, state).is_none()
}
