//! Linear tangent-plane (TAN) WCS: the fitted parameter set and its evaluation.
//!
//! A [`TanWcsParameters`] maps a pixel `(x, y)` to the sky as
//!
//! ```text
//! (u, v) = CD · (x − CRPIX1, y − CRPIX2)           intermediate world coords, degrees
//! lon = atan2(u, −v),  lat = atan(180 / (π·|u,v|))  native frame about CRVAL
//! (ra, dec) = native_to_sky(lon, lat, CRVAL)
//! ```
//!
//! No distortion terms are carried. [`fit`] derives the parameters for a detector.

pub mod fit;

use crate::error::{Result, WcsError};
use crate::native::{native_to_sky, sky_to_native, Pointing};
use crate::projection::{intermediate_to_native, native_to_intermediate};

/// Celestial reference frame of the fitted WCS.
pub const RADECSYS: &str = "ICRS";
/// Axis types of the gnomonic projection.
pub const CTYPE1: &str = "RA---TAN";
pub const CTYPE2: &str = "DEC--TAN";

/// Value of a single WCS header card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeaderValue {
    Text(&'static str),
    Real(f64),
}

/// `(keyword, value)` pair of a WCS header.
pub type HeaderCard = (&'static str, HeaderValue);

/// Fitted TAN WCS for one detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TanWcsParameters {
    /// Reference pixel `[CRPIX1, CRPIX2]`.
    pub crpix: [f64; 2],
    /// Reference sky position `[CRVAL1, CRVAL2]` (RA, Dec) in degrees.
    pub crval_deg: [f64; 2],
    /// Equinox of the RA/Dec frame in Julian years.
    pub equinox: f64,
    /// `[[CD1_1, CD1_2], [CD2_1, CD2_2]]` in degrees per pixel.
    pub cd_matrix: [[f64; 2]; 2],
}

impl TanWcsParameters {
    /// The reference sky position as a native-frame pointing.
    pub fn pointing(&self) -> Result<Pointing> {
        Pointing::from_degrees(self.crval_deg[0], self.crval_deg[1])
    }

    /// Determinant of the CD matrix, square degrees per pixel.
    pub fn cd_determinant(&self) -> f64 {
        let cd = &self.cd_matrix;
        cd[0][0] * cd[1][1] - cd[0][1] * cd[1][0]
    }

    /// Inverse of the CD matrix, `None` if singular.
    pub fn cd_inverse(&self) -> Option<[[f64; 2]; 2]> {
        let det = self.cd_determinant();
        if !(det.abs() >= 1e-30) {
            return None;
        }
        let cd = &self.cd_matrix;
        let inv_det = 1.0 / det;
        Some([
            [cd[1][1] * inv_det, -cd[0][1] * inv_det],
            [-cd[1][0] * inv_det, cd[0][0] * inv_det],
        ])
    }

    /// Approximate pixel scale in arcseconds per pixel.
    pub fn pixel_scale_arcsec(&self) -> f64 {
        self.cd_determinant().abs().sqrt() * 3600.0
    }

    /// Pixel → intermediate world coordinates `(u, v)` in degrees.
    pub fn pixel_to_intermediate(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.crpix[0];
        let dy = y - self.crpix[1];
        let cd = &self.cd_matrix;
        (
            cd[0][0] * dx + cd[0][1] * dy,
            cd[1][0] * dx + cd[1][1] * dy,
        )
    }

    /// Pixel → (RA, Dec) in degrees through the linear model.
    pub fn pixel_to_sky(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let pointing = self.pointing()?;
        let (u, v) = self.pixel_to_intermediate(x, y);
        let (lon, lat) = intermediate_to_native(u, v);
        let (ra, dec) = native_to_sky(lon, lat, &pointing);
        Ok((ra.to_degrees(), dec.to_degrees()))
    }

    /// (RA, Dec) in degrees → pixel through the inverse linear model.
    ///
    /// Fails for positions 90° or more from CRVAL and for a singular CD matrix.
    pub fn sky_to_pixel(&self, ra_deg: f64, dec_deg: f64) -> Result<(f64, f64)> {
        let pointing = self.pointing()?;
        let (lon, lat) = sky_to_native(ra_deg.to_radians(), dec_deg.to_radians(), &pointing);
        if lat <= 0.0 {
            return Err(WcsError::OutsideTangentPlane {
                ra_deg,
                dec_deg,
                lat_deg: lat.to_degrees(),
            });
        }
        let inv = self.cd_inverse().ok_or(WcsError::NonInvertibleCd {
            determinant: self.cd_determinant(),
        })?;
        let (u, v) = native_to_intermediate(lon, lat);
        Ok((
            inv[0][0] * u + inv[0][1] * v + self.crpix[0],
            inv[1][0] * u + inv[1][1] * v + self.crpix[1],
        ))
    }

    /// Header cards of the standard TAN WCS, in canonical order.
    pub fn header_cards(&self) -> Vec<HeaderCard> {
        use HeaderValue::{Real, Text};
        let cd = &self.cd_matrix;
        vec![
            ("RADECSYS", Text(RADECSYS)),
            ("EQUINOX", Real(self.equinox)),
            ("CRVAL1", Real(self.crval_deg[0])),
            ("CRVAL2", Real(self.crval_deg[1])),
            ("CRPIX1", Real(self.crpix[0])),
            ("CRPIX2", Real(self.crpix[1])),
            ("CTYPE1", Text(CTYPE1)),
            ("CTYPE2", Text(CTYPE2)),
            ("CD1_1", Real(cd[0][0])),
            ("CD1_2", Real(cd[0][1])),
            ("CD2_1", Real(cd[1][0])),
            ("CD2_2", Real(cd[1][1])),
        ]
    }
}
