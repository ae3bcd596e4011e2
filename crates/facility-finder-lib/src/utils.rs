//! Utility functions for geographic distances and coordinate checks

use crate::Position;

/// Earth's radius in meters (spherical approximation)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Maximum absolute latitude in degrees
pub const MAX_LATITUDE: f64 = 90.0;

/// Maximum absolute longitude in degrees
pub const MAX_LONGITUDE: f64 = 180.0;

/// Great-circle distance between two positions in meters
///
/// Uses the Haversine formula on a sphere of radius [`EARTH_RADIUS_M`].
/// Inputs are expected to be finite; the result is symmetric and zero for
/// identical positions.
#[inline]
pub fn haversine_distance(a: Position, b: Position) -> f64 {
    let lat1 = a.lat().to_radians();
    let lat2 = b.lat().to_radians();
    let delta_lat = (b.lat() - a.lat()).to_radians();
    let delta_lon = (b.lon() - a.lon()).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Check that a latitude/longitude pair is finite and within WGS84 bounds
#[inline]
pub fn is_valid_wgs84(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && lat.abs() <= MAX_LATITUDE
        && lon.abs() <= MAX_LONGITUDE
}

/// Format a distance in meters as a short human-readable string
pub fn format_distance(meters: f64) -> String {
    let km = meters / 1000.0;
    if km < 1.0 {
        format!("{:.0} m", meters)
    } else if km < 100.0 {
        format!("{:.2} km", km)
    } else {
        format!("{:.0} km", km)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_is_zero_for_same_point() {
        let p = Position::new(23.182, 75.784);
        assert_eq!(haversine_distance(p, p), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            (Position::new(23.182, 75.784), Position::new(23.176, 75.789)),
            (Position::new(51.5074, -0.1278), Position::new(48.8566, 2.3522)),
            (Position::new(-33.8688, 151.2093), Position::new(35.6762, 139.6503)),
            (Position::new(0.0, 179.9), Position::new(0.0, -179.9)),
        ];
        for (a, b) in pairs {
            let ab = haversine_distance(a, b);
            let ba = haversine_distance(b, a);
            assert!((ab - ba).abs() < 1e-6, "{ab} != {ba}");
        }
    }

    #[test]
    fn test_short_distance_sanity_bound() {
        let facility = Position::new(23.182, 75.784);
        let user = Position::new(23.1825, 75.7845);
        let d = haversine_distance(facility, user);
        assert!(d > 0.0);
        assert!(d < 100.0, "expected < 100 m, got {d}");
    }

    #[test]
    fn test_known_distance_london_paris() {
        let london = Position::new(51.5074, -0.1278);
        let paris = Position::new(48.8566, 2.3522);
        let d = haversine_distance(london, paris);
        // ~343.5 km on a 6371 km sphere
        assert!((d - 343_500.0).abs() < 1_000.0, "got {d}");
    }

    #[test]
    fn test_antimeridian_is_short() {
        let a = Position::new(0.0, 179.9);
        let b = Position::new(0.0, -179.9);
        assert!(haversine_distance(a, b) < 25_000.0);
    }

    #[test]
    fn test_is_valid_wgs84() {
        assert!(is_valid_wgs84(23.182, 75.784));
        assert!(is_valid_wgs84(-90.0, 180.0));
        assert!(!is_valid_wgs84(90.1, 0.0));
        assert!(!is_valid_wgs84(0.0, -180.5));
        assert!(!is_valid_wgs84(f64::NAN, 0.0));
        assert!(!is_valid_wgs84(0.0, f64::INFINITY));
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(42.4), "42 m");
        assert_eq!(format_distance(1_500.0), "1.50 km");
        assert_eq!(format_distance(250_000.0), "250 km");
    }
}
