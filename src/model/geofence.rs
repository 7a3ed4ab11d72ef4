use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Radius applied when a project has no geofence radius configured.
pub const DEFAULT_RADIUS_METERS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "latitude": 23.8103, "longitude": 90.4125 }))]
pub struct Coordinate {
    #[schema(example = 23.8103)]
    pub latitude: f64,
    #[schema(example = 90.4125)]
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Circular boundary around a project site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoFence {
    pub center: Coordinate,
    #[schema(example = 100.0)]
    pub radius_meters: f64,
}

impl GeoFence {
    /// Builds a fence, falling back to [`DEFAULT_RADIUS_METERS`] when the
    /// project row carries no radius.
    pub fn new(center: Coordinate, radius_meters: Option<f64>) -> Self {
        Self {
            center,
            radius_meters: radius_meters.unwrap_or(DEFAULT_RADIUS_METERS),
        }
    }

    /// A fence with a zero, negative or NaN radius never admits anyone.
    pub fn is_usable(&self) -> bool {
        self.radius_meters > 0.0
    }
}

/// Row shape of `projects` as read by the geofence lookup.
#[derive(Debug, sqlx::FromRow)]
pub struct ProjectSite {
    pub latitude: f64,
    pub longitude: f64,
    pub geofence_radius_m: Option<f64>,
}

impl From<ProjectSite> for GeoFence {
    fn from(site: ProjectSite) -> Self {
        GeoFence::new(
            Coordinate::new(site.latitude, site.longitude),
            site.geofence_radius_m,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_radius_defaults_to_one_hundred_meters() {
        let fence = GeoFence::new(Coordinate::new(23.81, 90.41), None);
        assert_eq!(fence.radius_meters, 100.0);
        assert!(fence.is_usable());
    }

    #[test]
    fn non_positive_radius_is_unusable() {
        let center = Coordinate::new(0.0, 0.0);
        assert!(!GeoFence::new(center, Some(0.0)).is_usable());
        assert!(!GeoFence::new(center, Some(-5.0)).is_usable());
        assert!(!GeoFence::new(center, Some(f64::NAN)).is_usable());
    }
}
