//! Geographic utilities.
//!
//! The proximity primitives ([`distance`], [`near`]) work in raw degree space.
//! That is only meaningful because every anchor of a run sits inside one
//! metropolitan area; there is no geodesic correction. Haversine length is
//! only used for human-facing summaries (segment lengths in meters).

use geo::{HaversineLength, LineString};

use crate::{GeoPoint, Ping};

/// Reference proximity radius in degrees (~500m).
pub const DEFAULT_SLACK: f64 = 0.005;

/// Meters per degree of latitude (approximately constant).
const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Euclidean distance between two coordinates, in degrees.
pub fn distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let dlat = p1.latitude - p2.latitude;
    let dlng = p1.longitude - p2.longitude;
    (dlat * dlat + dlng * dlng).sqrt()
}

/// True iff `p1` and `p2` are strictly closer than `slack` degrees.
///
/// A plain radius test, not a geofence.
pub fn near(p1: &GeoPoint, p2: &GeoPoint, slack: f64) -> bool {
    distance(p1, p2) < slack
}

/// Total haversine length in meters of a ping sequence.
pub fn path_length_meters(points: &[Ping]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let line: LineString<f64> = points
        .iter()
        .map(|p| (p.longitude, p.latitude))
        .collect::<Vec<_>>()
        .into();
    line.haversine_length()
}

/// Convert a distance in meters to degrees of latitude/longitude at `latitude`.
///
/// Uses the longitude scale, which is the larger of the two away from the equator.
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let meters_per_deg_lng = METERS_PER_DEG_LAT * latitude.to_radians().cos();
    if meters_per_deg_lng.abs() < 1e-10 {
        return meters / METERS_PER_DEG_LAT;
    }
    meters / meters_per_deg_lng
}
