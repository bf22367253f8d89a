const EARTH_RADIUS_M: f64 = 6_371_000.0;
const METRES_PER_MILE: f64 = 1609.344;

/// Circle around the workplace that gates staff clock actions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    pub lat: f64,
    pub lng: f64,
    pub radius_m: f64,
}

impl Default for Geofence {
    /// 0.1 miles around the workplace.
    fn default() -> Self {
        Self {
            lat: 51.617404,
            lng: -0.311809,
            radius_m: 160.934,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeofenceCheck {
    Inside,
    Outside { distance_m: f64 },
}

/// Great-circle distance in metres.
pub fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    EARTH_RADIUS_M * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

pub fn within_geofence(lat: f64, lng: f64, fence: &Geofence) -> bool {
    matches!(fence.check(lat, lng), GeofenceCheck::Inside)
}

pub fn valid_coordinates(lat: f64, lng: f64) -> bool {
    lat.is_finite() && lng.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

impl Geofence {
    pub fn check(&self, lat: f64, lng: f64) -> GeofenceCheck {
        let distance_m = haversine_m(lat, lng, self.lat, self.lng);
        if distance_m <= self.radius_m {
            GeofenceCheck::Inside
        } else {
            GeofenceCheck::Outside { distance_m }
        }
    }
}

/// Message shown when a clock action is refused; `action` is `"in"` or `"out"`.
pub fn denial_message(distance_m: f64, action: &str) -> String {
    format!(
        "You are {:.2} miles away from the workplace. Clock {} denied.",
        distance_m / METRES_PER_MILE,
        action
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Degrees of latitude per metre along a meridian.
    fn lat_offset(metres: f64) -> f64 {
        (metres / EARTH_RADIUS_M).to_degrees()
    }

    #[test]
    fn centre_is_inside() {
        let fence = Geofence::default();
        assert!(within_geofence(fence.lat, fence.lng, &fence));
        assert_eq!(fence.check(fence.lat, fence.lng), GeofenceCheck::Inside);
    }

    #[test]
    fn one_metre_past_radius_is_outside() {
        let fence = Geofence::default();
        let lat = fence.lat + lat_offset(fence.radius_m + 1.0);
        assert!(!within_geofence(lat, fence.lng, &fence));

        let lat = fence.lat + lat_offset(fence.radius_m - 1.0);
        assert!(within_geofence(lat, fence.lng, &fence));
    }

    #[test]
    fn haversine_matches_known_distance() {
        // London to Paris, roughly 343.5 km.
        let d = haversine_m(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((d - 343_500.0).abs() < 1_500.0, "{d}");
    }

    #[test]
    fn denial_message_reports_miles() {
        assert_eq!(
            denial_message(1609.344 * 2.5, "in"),
            "You are 2.50 miles away from the workplace. Clock in denied."
        );
    }

    #[test]
    fn coordinates_out_of_range_are_rejected() {
        assert!(valid_coordinates(51.6, -0.3));
        assert!(!valid_coordinates(91.0, 0.0));
        assert!(!valid_coordinates(0.0, f64::NAN));
    }
}
