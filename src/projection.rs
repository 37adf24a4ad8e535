//! Gnomonic (TAN) projection helpers.
//!
//! Two forms are used in this crate:
//!
//! - **Native form**: a native (lon, lat) from [`crate::native`] maps to
//!   intermediate world coordinates `(u, v)` in degrees by
//!   `R = (180/π)·cot(lat)`, `u = R·sin(lon)`, `v = −R·cos(lon)`
//!   (Calabretta & Greisen 2002, eqs. 12, 13, 54, 55). This is what the WCS fit uses.
//! - **Reference-point form**: classic `(ξ, η)` standard coordinates in radians
//!   about a tangent point `(ra₀, dec₀)`, used by the simulated camera.
//!
//! The two agree: `u = ξ·180/π`, `v = η·180/π` for the same tangent point.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Native (lon, lat) in radians → intermediate world coordinates `(u, v)` in degrees.
///
/// Diverges at `lat = 0` and changes sign character for `lat < 0`; callers must
/// keep to the hemisphere in front of the tangent plane.
#[inline]
pub fn native_to_intermediate(lon: f64, lat: f64) -> (f64, f64) {
    let radius = 180.0 / (PI * lat.tan());
    (radius * lon.sin(), -radius * lon.cos())
}

/// Intermediate world coordinates `(u, v)` in degrees → native (lon, lat) in radians.
///
/// Longitude is returned in `[0, 2π)`; the origin maps to the pole with lon = 0.
#[inline]
pub fn intermediate_to_native(u: f64, v: f64) -> (f64, f64) {
    let radius = (u * u + v * v).sqrt();
    if radius == 0.0 {
        return (0.0, FRAC_PI_2);
    }
    let lon = u.atan2(-v).rem_euclid(TAU);
    let lat = (180.0 / (PI * radius)).atan();
    (lon, lat)
}

/// Forward gnomonic projection about a tangent point.
///
/// Returns `(ξ, η)` in radians with ξ toward increasing RA and η toward north,
/// or `None` if the point is on or behind the tangent plane.
#[inline]
pub fn tan_project(ra: f64, dec: f64, ra0: f64, dec0: f64) -> Option<(f64, f64)> {
    let da = ra - ra0;
    let (sin_dec, cos_dec) = dec.sin_cos();
    let (sin_dec0, cos_dec0) = dec0.sin_cos();
    let (sin_da, cos_da) = da.sin_cos();

    let denom = sin_dec * sin_dec0 + cos_dec * cos_dec0 * cos_da;
    if denom <= 1e-12 {
        return None;
    }

    let xi = cos_dec * sin_da / denom;
    let eta = (sin_dec * cos_dec0 - cos_dec * sin_dec0 * cos_da) / denom;
    Some((xi, eta))
}

/// Inverse gnomonic projection about a tangent point.
///
/// RA is returned in `[0, 2π)`.
#[inline]
pub fn inverse_tan_project(xi: f64, eta: f64, ra0: f64, dec0: f64) -> (f64, f64) {
    let rho_sq = xi * xi + eta * eta;
    if rho_sq < 1e-30 {
        return (ra0.rem_euclid(TAU), dec0);
    }

    let (sin_dec0, cos_dec0) = dec0.sin_cos();
    let rho = rho_sq.sqrt();
    let (sin_c, cos_c) = rho.atan().sin_cos();

    let dec = (cos_c * sin_dec0 + eta * sin_c * cos_dec0 / rho).asin();
    let ra = ra0 + (xi * sin_c).atan2(rho * cos_dec0 * cos_c - eta * sin_dec0 * sin_c);
    (ra.rem_euclid(TAU), dec)
}
