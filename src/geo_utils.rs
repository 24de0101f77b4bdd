//! Geographic utilities shared across the scoring pipeline.

use geo::{Distance, Haversine, Point};

use crate::GeoPoint;

/// Rough degrees-per-kilometre conversion factor (1 degree ≈ 111 km at the
/// equator). Corridor buffers are approximate by design; this matches the
/// corridor widths the scoring model was tuned against.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Great-circle distance between two GPS points, in meters.
pub fn haversine_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    Haversine::distance(
        Point::new(a.longitude, a.latitude),
        Point::new(b.longitude, b.latitude),
    )
}

/// Convert a buffer width in kilometres to approximate degrees.
pub fn km_to_degrees(km: f64) -> f64 {
    km / KM_PER_DEGREE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);
        let distance = haversine_distance(&london, &paris);
        // ~343.5 km
        assert!(distance > 340_000.0 && distance < 348_000.0);
    }

    #[test]
    fn test_haversine_zero_distance() {
        let p = GeoPoint::new(12.9716, 77.5946);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_km_to_degrees() {
        assert_eq!(km_to_degrees(0.5), 0.5 / 111.0);
        assert_eq!(km_to_degrees(111.0), 1.0);
    }
}
