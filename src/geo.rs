//! Great-circle distance helpers.

use crate::models::Coordinates;

/// Mean Earth radius used by the Haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in kilometres.
pub fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
    // ---
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Round to two decimal places, the precision stations report distance in.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
