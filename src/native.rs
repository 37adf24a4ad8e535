//! Rotation between equatorial (RA, Dec) and the pointing-relative native frame.
//!
//! Native longitude and latitude are what RA and Dec would be if the celestial
//! pole sat at the telescope pointing. The frame is reached by two Euler rotations
//! of the Cartesian embedding (Calabretta & Greisen 2002, §2.3):
//!
//! ```text
//! sky → native:  v' = Rx(dec_p − π/2) · Rz(−ra_p) · v
//! native → sky:  v  = Rz(ra_p) · Rx(π/2 − dec_p) · v'
//! ```
//!
//! The embedding used throughout is `x = −cos(b)·sin(a)`, `y = cos(b)·cos(a)`,
//! `z = sin(b)`, so longitude 180° of the native frame points at celestial north.
//!
//! Longitude is recovered from the rotated vector as an arccos candidate on
//! `[0, π]` whose half-plane is then resolved from the signs of `x'` and `y'`.
//! At a native pole longitude is undefined and is reported as 0.
//!
//! All functions here work in radians except the `_deg` wrappers, which only
//! convert units. Pointing is always a single scalar [`Pointing`]; batches vary
//! the transformed positions only.

use std::f64::consts::{FRAC_PI_2, TAU};

use nalgebra::{Matrix3, Vector3};

use crate::error::{Result, WcsError};

/// Magnitude below which a trig value is treated as signless in the quadrant rule.
const SIGN_TOLERANCE: f64 = 1e-9;

/// `cos(lat)` at or below this is a native pole; longitude resolves to 0.
const POLE_COS_LAT: f64 = 1e-15;

/// Telescope pointing that defines the native frame. Radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointing {
    ra: f64,
    dec: f64,
}

impl Pointing {
    /// Create a pointing from RA/Dec in radians.
    ///
    /// Fails if either coordinate is non-finite or |dec| exceeds π/2.
    pub fn new(ra: f64, dec: f64) -> Result<Self> {
        if !ra.is_finite() || !dec.is_finite() {
            return Err(WcsError::InvalidPointing {
                ra,
                dec,
                reason: "non-finite coordinate",
            });
        }
        if dec.abs() > FRAC_PI_2 + 1e-12 {
            return Err(WcsError::InvalidPointing {
                ra,
                dec,
                reason: "declination outside [-90°, 90°]",
            });
        }
        Ok(Self { ra, dec })
    }

    /// Create a pointing from RA/Dec in degrees.
    pub fn from_degrees(ra_deg: f64, dec_deg: f64) -> Result<Self> {
        Self::new(ra_deg.to_radians(), dec_deg.to_radians())
    }

    /// Right ascension of the pointing, radians.
    pub fn ra(&self) -> f64 {
        self.ra
    }

    /// Declination of the pointing, radians.
    pub fn dec(&self) -> f64 {
        self.dec
    }

    /// Rotation taking equatorial unit vectors into the native frame.
    pub fn sky_to_native_matrix(&self) -> Matrix3<f64> {
        rotation_about_x(self.dec - FRAC_PI_2) * rotation_about_z(-self.ra)
    }

    /// Rotation taking native unit vectors back to equatorial. Transpose of
    /// [`Pointing::sky_to_native_matrix`].
    pub fn native_to_sky_matrix(&self) -> Matrix3<f64> {
        rotation_about_z(self.ra) * rotation_about_x(FRAC_PI_2 - self.dec)
    }
}

/// Basis rotation about the x axis by `alpha`.
pub fn rotation_about_x(alpha: f64) -> Matrix3<f64> {
    let (sa, ca) = alpha.sin_cos();
    Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, ca, sa, //
        0.0, -sa, ca,
    )
}

/// Rotation about the z axis by `beta`.
pub fn rotation_about_z(beta: f64) -> Matrix3<f64> {
    let (sb, cb) = beta.sin_cos();
    Matrix3::new(
        cb, -sb, 0.0, //
        sb, cb, 0.0, //
        0.0, 0.0, 1.0,
    )
}

/// Cartesian embedding of a (longitude, latitude) pair in radians.
#[inline]
pub fn unit_vector(lon: f64, lat: f64) -> Vector3<f64> {
    let (sin_lon, cos_lon) = lon.sin_cos();
    let (sin_lat, cos_lat) = lat.sin_cos();
    Vector3::new(-cos_lat * sin_lon, cos_lat * cos_lon, sin_lat)
}

/// numpy-style sign: 0 for 0.
#[inline]
fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Recover (longitude, latitude) from a rotated vector with the quadrant rule.
///
/// The arccos candidate lies in `[0, π]`; it is reflected to `2π − candidate`
/// when the x component it implies (`−sin(candidate)`) or the y ratio disagrees
/// in sign with the vector. Values within [`SIGN_TOLERANCE`] of zero never
/// trigger a reflection.
fn longitude_latitude(v: &Vector3<f64>) -> (f64, f64) {
    let cos_lat = (v.x * v.x + v.y * v.y).sqrt();
    let lat = v.z.atan2(cos_lat);
    if !(cos_lat > POLE_COS_LAT) {
        return (0.0, lat);
    }

    let y_ratio = v.y / cos_lat;
    // Same value as acos(y_ratio) on [0, π], without NaN from |y_ratio| rounding past 1.
    let candidate = v.x.abs().atan2(v.y);
    let x_implied = -candidate.sin();

    let x_disagrees = x_implied.abs() > SIGN_TOLERANCE && sign(x_implied) != sign(v.x);
    let y_disagrees = y_ratio.abs() > SIGN_TOLERANCE && sign(y_ratio) != sign(v.y);
    if x_disagrees || y_disagrees {
        (TAU - candidate, lat)
    } else {
        (candidate, lat)
    }
}

#[inline]
fn rotate(a: f64, b: f64, m: &Matrix3<f64>) -> (f64, f64) {
    longitude_latitude(&(m * unit_vector(a, b)))
}

fn rotate_batch(a: &[f64], b: &[f64], m: &Matrix3<f64>) -> Result<(Vec<f64>, Vec<f64>)> {
    WcsError::check_len(a.len(), b.len())?;
    Ok(a.iter().zip(b).map(|(&a, &b)| rotate(a, b, m)).unzip())
}

/// Convert equatorial (ra, dec) to native (lon, lat). Radians.
///
/// Never fails: at a native pole the longitude is 0.
pub fn sky_to_native(ra: f64, dec: f64, pointing: &Pointing) -> (f64, f64) {
    rotate(ra, dec, &pointing.sky_to_native_matrix())
}

/// Convert native (lon, lat) back to equatorial (ra, dec). Radians.
///
/// At a celestial pole the RA is 0.
pub fn native_to_sky(lon: f64, lat: f64, pointing: &Pointing) -> (f64, f64) {
    rotate(lon, lat, &pointing.native_to_sky_matrix())
}

/// Element-wise [`sky_to_native`] over equal-length batches.
pub fn sky_to_native_batch(
    ra: &[f64],
    dec: &[f64],
    pointing: &Pointing,
) -> Result<(Vec<f64>, Vec<f64>)> {
    rotate_batch(ra, dec, &pointing.sky_to_native_matrix())
}

/// Element-wise [`native_to_sky`] over equal-length batches.
pub fn native_to_sky_batch(
    lon: &[f64],
    lat: &[f64],
    pointing: &Pointing,
) -> Result<(Vec<f64>, Vec<f64>)> {
    rotate_batch(lon, lat, &pointing.native_to_sky_matrix())
}

/// [`sky_to_native`] with degrees in and out.
pub fn sky_to_native_deg(ra_deg: f64, dec_deg: f64, pointing: &Pointing) -> (f64, f64) {
    let (lon, lat) = sky_to_native(ra_deg.to_radians(), dec_deg.to_radians(), pointing);
    (lon.to_degrees(), lat.to_degrees())
}

/// [`native_to_sky`] with degrees in and out.
pub fn native_to_sky_deg(lon_deg: f64, lat_deg: f64, pointing: &Pointing) -> (f64, f64) {
    let (ra, dec) = native_to_sky(lon_deg.to_radians(), lat_deg.to_radians(), pointing);
    (ra.to_degrees(), dec.to_degrees())
}

/// [`sky_to_native_batch`] with degrees in and out.
pub fn sky_to_native_batch_deg(
    ra_deg: &[f64],
    dec_deg: &[f64],
    pointing: &Pointing,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let ra: Vec<f64> = ra_deg.iter().map(|a| a.to_radians()).collect();
    let dec: Vec<f64> = dec_deg.iter().map(|a| a.to_radians()).collect();
    let (lon, lat) = sky_to_native_batch(&ra, &dec, pointing)?;
    Ok((
        lon.into_iter().map(f64::to_degrees).collect(),
        lat.into_iter().map(f64::to_degrees).collect(),
    ))
}

/// [`native_to_sky_batch`] with degrees in and out.
pub fn native_to_sky_batch_deg(
    lon_deg: &[f64],
    lat_deg: &[f64],
    pointing: &Pointing,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let lon: Vec<f64> = lon_deg.iter().map(|a| a.to_radians()).collect();
    let lat: Vec<f64> = lat_deg.iter().map(|a| a.to_radians()).collect();
    let (ra, dec) = native_to_sky_batch(&lon, &lat, pointing)?;
    Ok((
        ra.into_iter().map(f64::to_degrees).collect(),
        dec.into_iter().map(f64::to_degrees).collect(),
    ))
}

/// Great-circle distance between two positions (haversine). Radians.
pub fn angular_separation(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    let s_dec = ((dec2 - dec1) / 2.0).sin();
    let s_ra = ((ra2 - ra1) / 2.0).sin();
    let h = s_dec * s_dec + dec1.cos() * dec2.cos() * s_ra * s_ra;
    2.0 * h.sqrt().min(1.0).asin()
}
