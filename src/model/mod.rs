pub mod attendance;
pub mod geofence;
pub mod manual_request;
pub mod schedule;
