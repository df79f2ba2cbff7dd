//! Great-circle geodesy
//!
//! Bearing and distance between two WGS84 positions, treating the earth as a
//! sphere. Accurate enough for AIS ranges; no ellipsoid correction.

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const NAUTICAL_MILE: f64 = 1852.0;
pub const KN_TO_MS: f64 = NAUTICAL_MILE / 3600.0;
pub const MS_TO_KN: f64 = 3600.0 / NAUTICAL_MILE;

/// Normalize an angle in degrees to the 0-360 range
#[inline]
pub fn normalize_bearing(bearing: f64) -> f64 {
    (bearing % 360.0 + 360.0) % 360.0
}

/// Initial great-circle bearing from point 1 to point 2
///
/// # Returns
///
/// Degrees true in `[0, 360)`. Coincident points yield 0.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    normalize_bearing(y.atan2(x).to_degrees())
}

/// Haversine distance in meters between two points
///
/// The haversine term is clamped to `[0, 1]` so that rounding on antipodal or
/// coincident points can never produce NaN.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}
