//! Proximity to a real-world target (location seal)

use crate::platform::GeoFix;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two lat/lon pairs (degrees)
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// 1 at the target, falling linearly to 0 at `range_m`
pub fn hot_cold_ratio(distance_m: f64, range_m: f64) -> f32 {
    if range_m <= 0.0 {
        return if distance_m <= 0.0 { 1.0 } else { 0.0 };
    }
    (1.0 - distance_m / range_m).clamp(0.0, 1.0) as f32
}

/// Distance to a fixed target, filtering out vague fixes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityCheck {
    pub target_lat: f64,
    pub target_lon: f64,
    pub radius_m: f64,
    pub max_accuracy_m: f64,
}

/// Reading of one fix against the target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proximity {
    pub distance_m: f64,
    /// Accurate enough to be trusted
    pub trusted: bool,
    pub in_range: bool,
}

impl ProximityCheck {
    pub fn evaluate(&self, fix: &GeoFix) -> Proximity {
        let distance_m = haversine_m(fix.lat, fix.lon, self.target_lat, self.target_lon);
        let trusted = fix.accuracy <= self.max_accuracy_m;
        Proximity {
            distance_m,
            trusted,
            in_range: trusted && distance_m <= self.radius_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TARGET: (f64, f64) = (44.4179171, 26.0019865);

    fn check() -> ProximityCheck {
        ProximityCheck {
            target_lat: TARGET.0,
            target_lon: TARGET.1,
            radius_m: 5.0,
            max_accuracy_m: 50.0,
        }
    }

    #[test]
    fn test_reference_pair() {
        // Paris to London
        let d = haversine_m(48.8566, 2.3522, 51.5074, -0.1278);
        assert!((d - 343_556.06).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn test_city_scale_distance() {
        let d = haversine_m(TARGET.0, TARGET.1, 44.4268, 26.1025);
        assert!((d - 8043.2).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn test_in_range_needs_accuracy() {
        // ~3.3 m north of the target
        let near = GeoFix {
            lat: TARGET.0 + 0.00003,
            lon: TARGET.1,
            accuracy: 10.0,
        };
        let reading = check().evaluate(&near);
        assert!((reading.distance_m - 3.34).abs() < 0.05);
        assert!(reading.in_range);

        let vague = GeoFix { accuracy: 80.0, ..near };
        let reading = check().evaluate(&vague);
        assert!(!reading.trusted);
        assert!(!reading.in_range);
    }

    #[test]
    fn test_hot_cold_ratio() {
        assert_eq!(hot_cold_ratio(0.0, 1000.0), 1.0);
        assert_eq!(hot_cold_ratio(500.0, 1000.0), 0.5);
        assert_eq!(hot_cold_ratio(5000.0, 1000.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_distance_to_self_is_zero(lat in -89.0f64..89.0, lon in -180.0f64..180.0) {
            prop_assert!(haversine_m(lat, lon, lat, lon).abs() < 1e-6);
        }

        #[test]
        fn prop_symmetric(
            lat1 in -89.0f64..89.0, lon1 in -180.0f64..180.0,
            lat2 in -89.0f64..89.0, lon2 in -180.0f64..180.0,
        ) {
            let ab = haversine_m(lat1, lon1, lat2, lon2);
            let ba = haversine_m(lat2, lon2, lat1, lon1);
            prop_assert!((ab - ba).abs() < 1e-6);
        }
    }
}
