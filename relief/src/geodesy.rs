//! Geodetic conversions over the WGS84 reference ellipsoid.
//!
//! This module provides the pure coordinate primitives used throughout the
//! library: conversions between geodetic coordinates (latitude, longitude,
//! height) and Earth-Centered-Earth-Fixed (ECEF) Cartesian coordinates, the
//! local East-North-Up basis, and conversions between horizontal (azimuth,
//! elevation) angles and ECEF direction vectors.
//!
//! Angles are expressed in degrees at the API boundary and radians
//! internally.

use crate::error::{Error, Result};

/// WGS84 semi-major axis, in meters.
pub const WGS84_A: f64 = 6_378_137.0;

/// WGS84 first eccentricity.
pub const WGS84_E: f64 = 0.081819190842622;

/// Compute ECEF coordinates from geodetic ones.
///
/// # Arguments
///
/// * `latitude` - Geodetic latitude in degrees
/// * `longitude` - Longitude in degrees
/// * `elevation` - Height above the ellipsoid in meters
///
/// # Returns
///
/// The `[x, y, z]` ECEF coordinates in meters.
pub fn geodetic_to_ecef(latitude: f64, longitude: f64, elevation: f64) -> [f64; 3] {
    let (a, e) = (WGS84_A, WGS84_E);

    let s = latitude.to_radians().sin();
    let c = latitude.to_radians().cos();
    let r = a / (1.0 - e * e * s * s).sqrt();

    [
        (r + elevation) * c * longitude.to_radians().cos(),
        (r + elevation) * c * longitude.to_radians().sin(),
        (r * (1.0 - e * e) + elevation) * s,
    ]
}

/// Compute geodetic coordinates from ECEF ones.
///
/// Uses B. R. Bowring's 1985 algorithm with a single iteration, which is
/// accurate to well below a millimeter for terrestrial positions.
///
/// # Arguments
///
/// * `ecef` - The `[x, y, z]` ECEF coordinates in meters
///
/// # Returns
///
/// The `(latitude, longitude, elevation)` tuple, in degrees and meters.
pub fn ecef_to_geodetic(ecef: [f64; 3]) -> (f64, f64, f64) {
    let (a, e) = (WGS84_A, WGS84_E);
    let b2 = a * a * (1.0 - e * e);
    let b = b2.sqrt();
    let eb2 = e * e * a * a / b2;

    // On the polar axis the longitude is degenerate.
    if ecef[0] == 0.0 && ecef[1] == 0.0 {
        let latitude = if ecef[2] >= 0.0 { 90.0 } else { -90.0 };
        return (latitude, 0.0, ecef[2].abs() - b);
    }

    let longitude = ecef[1].atan2(ecef[0]).to_degrees();

    let p2 = ecef[0] * ecef[0] + ecef[1] * ecef[1];
    let p = p2.sqrt();
    if ecef[2] == 0.0 {
        return (0.0, longitude, p - a);
    }

    let r = (p2 + ecef[2] * ecef[2]).sqrt();
    let tu = b * ecef[2] * (1.0 + eb2 * b / r) / (a * p);
    let cu = 1.0 / (1.0 + tu * tu).sqrt();
    let su = cu * tu;
    let tp = (ecef[2] + eb2 * b * su * su * su) / (p - e * e * a * cu * cu * cu);
    let latitude = tp.atan().to_degrees();

    let cp = 1.0 / (1.0 + tp * tp).sqrt();
    let sp = cp * tp;
    let elevation = p * cp + ecef[2] * sp - a * (1.0 - e * e * sp * sp).sqrt();

    (latitude, longitude, elevation)
}

/// Compute the local East, North, Up basis vectors at a geodetic position.
///
/// The basis is right-handed and orthonormal, expressed in ECEF
/// coordinates.
pub fn enu_basis(latitude: f64, longitude: f64) -> ([f64; 3], [f64; 3], [f64; 3]) {
    let lambda = longitude.to_radians();
    let phi = latitude.to_radians();
    let (sl, cl) = lambda.sin_cos();
    let (sp, cp) = phi.sin_cos();

    let east = [-sl, cl, 0.0];
    let north = [-cl * sp, -sl * sp, cp];
    let up = [cl * cp, sl * cp, sp];
    (east, north, up)
}

/// Compute an ECEF direction vector from horizontal coordinates.
///
/// # Arguments
///
/// * `latitude`, `longitude` - The observer position, in degrees
/// * `azimuth` - Azimuth angle in degrees, clockwise from North
/// * `elevation` - Elevation angle in degrees above the horizon
///
/// # Returns
///
/// The unit `[x, y, z]` direction in the ECEF frame.
pub fn ecef_from_horizontal(
    latitude: f64,
    longitude: f64,
    azimuth: f64,
    elevation: f64,
) -> [f64; 3] {
    let (e, n, u) = enu_basis(latitude, longitude);

    let az = azimuth.to_radians();
    let el = elevation.to_radians();
    let ce = el.cos();
    let r = [ce * az.sin(), ce * az.cos(), el.sin()];

    [
        r[0] * e[0] + r[1] * n[0] + r[2] * u[0],
        r[0] * e[1] + r[1] * n[1] + r[2] * u[1],
        r[0] * e[2] + r[1] * n[2] + r[2] * u[2],
    ]
}

/// Compute horizontal coordinates from an ECEF direction vector.
///
/// # Arguments
///
/// * `latitude`, `longitude` - The observer position, in degrees
/// * `direction` - The `[x, y, z]` direction in the ECEF frame; it does
///   not need to be normalized
///
/// # Returns
///
/// The `(azimuth, elevation)` angles in degrees.
///
/// # Errors
///
/// Returns [`Error::Domain`] if the direction is the null vector.
pub fn ecef_to_horizontal(
    latitude: f64,
    longitude: f64,
    direction: [f64; 3],
) -> Result<(f64, f64)> {
    let (e, n, u) = enu_basis(latitude, longitude);

    let x = e[0] * direction[0] + e[1] * direction[1] + e[2] * direction[2];
    let y = n[0] * direction[0] + n[1] * direction[1] + n[2] * direction[2];
    let z = u[0] * direction[0] + u[1] * direction[1] + u[2] * direction[2];
    let r2 = direction[0] * direction[0] + direction[1] * direction[1] + direction[2] * direction[2];
    if r2 <= f64::from(f32::EPSILON) {
        return Err(Error::Domain("null direction vector".into()));
    }

    let azimuth = x.atan2(y).to_degrees();
    let elevation = (z / r2.sqrt()).asin().to_degrees();
    Ok((azimuth, elevation))
}

/// Compute the meridional and prime-vertical curvature radii at a latitude.
///
/// Returns `(M, N)` in meters, where `M` is the radius of curvature in the
/// meridian plane and `N` in the prime vertical.
pub fn curvature_radii(latitude: f64) -> (f64, f64) {
    let (a, e) = (WGS84_A, WGS84_E);
    let s = latitude.to_radians().sin();
    let w2 = 1.0 - e * e * s * s;
    let n = a / w2.sqrt();
    let m = a * (1.0 - e * e) / (w2 * w2.sqrt());
    (m, n)
}
