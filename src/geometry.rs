//! Geometric primitives shared by the clustering, forecasting and coverage engines.
//!
//! All distances are great-circle distances in kilometres. Coordinates are decimal
//! degrees with latitude in `[-90, 90]` and longitude in `[-180, 180]`.
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres, used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lng: f64,
}

impl Coordinate {
    /// Create a new coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and within the valid degree ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lng)
    }
}

/// Great-circle distance between two coordinates in kilometres.
///
/// The intermediate haversine term is clamped to `[0, 1]` so that rounding noise for
/// antipodal or near-identical points cannot produce a NaN from `sqrt`/`asin`.
pub fn haversine_distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Even-odd ray-casting test for whether `point` lies inside the polygon `ring`.
///
/// NB: ring vertices are `(lng, lat)` pairs — longitude first. This matches the
/// convention used by the territory editor which produces the rings, and is applied
/// consistently across the engine and its callers.
///
/// Returns `false` for empty or degenerate rings (fewer than three vertices).
pub fn point_in_polygon(point: Coordinate, ring: &[(f64, f64)]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let (x, y) = (point.lng, point.lat);
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// The smallest radius (km) of a circle centred at `center` containing all `points`.
///
/// Returns `0` for an empty set, and `0` for a singleton set located at `center`.
pub fn bounding_circle_radius_km(center: Coordinate, points: &[Coordinate]) -> f64 {
    points
        .iter()
        .map(|point| haversine_distance_km(center, *point))
        .fold(0.0, f64::max)
}
