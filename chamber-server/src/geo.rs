//! Great-circle distance helpers
//!
//! Haversine on a spherical Earth. Good enough for "is the provider at the
//! building" and a rough ETA; this is not road routing.

use shared::models::Coordinates;

/// Mean Earth radius (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometres
pub fn distance_km(from: Coordinates, to: Coordinates) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Whether a coordinate pair is finite and inside the valid degree ranges
pub fn is_valid(c: Coordinates) -> bool {
    c.lat.is_finite()
        && c.lng.is_finite()
        && (-90.0..=90.0).contains(&c.lat)
        && (-180.0..=180.0).contains(&c.lng)
}

/// Point `km` kilometres due north of `origin` (test and demo helper)
pub fn offset_north(origin: Coordinates, km: f64) -> Coordinates {
    let d_lat = (km / EARTH_RADIUS_KM).to_degrees();
    Coordinates::new(origin.lat + d_lat, origin.lng)
}
