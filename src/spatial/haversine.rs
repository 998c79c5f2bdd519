//! Great-circle distance on a spherical Earth.

/// Earth mean radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Central angle in radians between two points given in radians.
///
/// `sqrt(a)` is clamped to 1 so that rounding at antipodal points never takes
/// `asin` out of its domain.
pub fn haversine_rad(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let half_dlat = (lat2 - lat1) / 2.0;
    let half_dlon = (lon2 - lon1) / 2.0;

    let a = half_dlat.sin().powi(2) + lat1.cos() * lat2.cos() * half_dlon.sin().powi(2);

    2.0 * a.sqrt().min(1.0).asin()
}

/// Distance in kilometers between two points given in degrees
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_rad(
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    ) * EARTH_RADIUS_KM
}

/// Round a distance to 2 decimal places, ties to even
pub fn round_km(distance_km: f64) -> f64 {
    (distance_km * 100.0).round_ties_even() / 100.0
}

/// Distances closer than this are treated as equal when ranking
pub const DISTANCE_QUANTUM_KM: f64 = 1e-6;

/// Integer ranking key for a distance, in units of [`DISTANCE_QUANTUM_KM`].
///
/// Sorting on the key is transitive, and distances that differ only by float
/// noise land on the same key so the position tie-break decides.
pub fn distance_key(distance_km: f64) -> i64 {
    (distance_km / DISTANCE_QUANTUM_KM).round() as i64
}

/// Unit vector on the sphere for a point given in radians.
///
/// Euclidean distance between unit vectors grows monotonically with the
/// central angle, so ordering by chord length is ordering by haversine.
pub fn unit_vector(lat: f64, lon: f64) -> [f64; 3] {
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat]
}
