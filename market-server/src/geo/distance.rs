//! Great-circle distance (haversine)

use shared::models::GeoPoint;

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in km, rounded to 2 decimals
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    round2(EARTH_RADIUS_KM * c)
}

/// Distance between two points, `None` when either is the unset sentinel (0,0)
pub fn distance_between(a: GeoPoint, b: GeoPoint) -> Option<f64> {
    if a.is_unset() || b.is_unset() {
        return None;
    }
    Some(haversine_km(a, b))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        let p = GeoPoint::new(77.5946, 12.9716);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn test_one_degree_latitude() {
        // 1° of latitude ≈ 111.19 km on a 6371 km sphere
        let a = GeoPoint::new(77.0, 12.0);
        let b = GeoPoint::new(77.0, 13.0);
        assert_eq!(haversine_km(a, b), 111.19);
    }

    #[test]
    fn test_unset_sentinel_has_no_distance() {
        let set = GeoPoint::new(77.5946, 12.9716);
        assert_eq!(distance_between(set, GeoPoint::default()), None);
        assert_eq!(distance_between(GeoPoint::default(), set), None);
    }
}
