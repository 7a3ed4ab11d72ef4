//! Geofence and work-schedule evaluation behind attendance actions.

pub mod clock;
pub mod gate;
pub mod geo;
pub mod location;
pub mod manual;
pub mod schedule_clock;
pub mod schedule_resolver;
pub mod service;
pub mod session;
