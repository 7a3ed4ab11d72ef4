use crate::model::geofence::Coordinate;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance in meters (Haversine).
///
/// NaN coordinates yield NaN; callers must treat that as "unknown",
/// never as "in range".
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // h can drift past 1.0 for antipodal points; clamp keeps NaN as NaN
    let c = 2.0 * h.sqrt().clamp(0.0, 1.0).asin();
    EARTH_RADIUS_METERS * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let p = Coordinate::new(23.8103, 90.4125);
        assert_eq!(distance_meters(p, p), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (Coordinate::new(23.8103, 90.4125), Coordinate::new(22.3569, 91.7832)),
            (Coordinate::new(-33.8688, 151.2093), Coordinate::new(51.5074, -0.1278)),
            (Coordinate::new(89.9, 0.0), Coordinate::new(-89.9, 179.9)),
        ];
        for (a, b) in pairs {
            assert_eq!(distance_meters(a, b), distance_meters(b, a));
        }
    }

    #[test]
    fn one_degree_of_longitude_on_equator() {
        let d = distance_meters(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0));
        assert!((d - 111_195.0).abs() < 200.0, "got {d}");
    }

    #[test]
    fn antipodal_points_are_half_circumference_apart() {
        let d = distance_meters(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_METERS).abs() < 1.0);
    }

    #[test]
    fn nan_propagates() {
        let d = distance_meters(Coordinate::new(f64::NAN, 0.0), Coordinate::new(0.0, 0.0));
        assert!(d.is_nan());
    }
}
