//! Ideal pinhole camera implementing the collaborator traits.
//!
//! Detectors are flat pixel grids placed in the focal plane. The optical axis
//! passes through the focal-plane origin.
//!
//! # Pipeline
//!
//! ```text
//! pixel → placement → focal plane (mm) → [undistort] → parity → × plate scale
//!       → rotate by rotSkyPos → inverse TAN about the observed pointing → (ra, dec)
//! ```
//!
//! With `apply_distortion == false` the undistort step is skipped, i.e. the input
//! pixels are already tangent pixels. The reverse direction runs the same steps
//! backwards.

use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, TAU};

use anyhow::{anyhow, bail};

use super::radial::RadialDistortion;
use super::{
    Astrometry, CameraGeometry, Detector, FocalPlanePoint, ObservationMetadata,
    SyntheticExposure,
};
use crate::projection::{inverse_tan_project, tan_project};
use crate::wcs::TanWcsParameters;

/// Where a detector sits in the focal plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorPlacement {
    /// Focal-plane position of pixel (0, 0), mm.
    pub origin_mm: [f64; 2],
    /// Pixel pitch, mm.
    pub pitch_mm: f64,
}

impl DetectorPlacement {
    /// Placement that centres a `width` × `height` detector at `center_mm`.
    pub fn centered(center_mm: [f64; 2], pitch_mm: f64, width: u32, height: u32) -> Self {
        Self {
            origin_mm: [
                center_mm[0] - 0.5 * width as f64 * pitch_mm,
                center_mm[1] - 0.5 * height as f64 * pitch_mm,
            ],
            pitch_mm,
        }
    }

    /// Pixel → focal plane, mm.
    #[inline]
    pub fn pixel_to_focal_plane(&self, x: f64, y: f64) -> FocalPlanePoint {
        (
            self.origin_mm[0] + x * self.pitch_mm,
            self.origin_mm[1] + y * self.pitch_mm,
        )
    }

    /// Focal plane, mm → pixel.
    #[inline]
    pub fn focal_plane_to_pixel(&self, fx: f64, fy: f64) -> (f64, f64) {
        (
            (fx - self.origin_mm[0]) / self.pitch_mm,
            (fy - self.origin_mm[1]) / self.pitch_mm,
        )
    }
}

/// Camera with a flat focal plane, a single plate scale and optional radial distortion.
#[derive(Debug, Clone)]
pub struct SimulatedCamera {
    /// Tangent-plane radians per focal-plane mm (`1 / focal length`).
    pub plate_scale_rad_per_mm: f64,
    /// Whether the focal-plane x axis runs against increasing RA.
    pub parity_flip: bool,
    /// Physical focal plane relative to the ideal pinhole image.
    pub distortion: RadialDistortion,
    /// `(ΔRA, ΔDec)` that [`Astrometry::observed_from_icrs`] adds, radians.
    pub refraction_offset_rad: [f64; 2],
    detectors: HashMap<String, DetectorPlacement>,
}

impl SimulatedCamera {
    /// Camera with the given focal length, no detectors, no distortion.
    pub fn new(focal_length_mm: f64) -> Self {
        Self {
            plate_scale_rad_per_mm: 1.0 / focal_length_mm,
            parity_flip: false,
            distortion: RadialDistortion::default(),
            refraction_offset_rad: [0.0, 0.0],
            detectors: HashMap::new(),
        }
    }

    /// Place a named detector in the focal plane.
    pub fn with_detector(mut self, name: impl Into<String>, placement: DetectorPlacement) -> Self {
        self.detectors.insert(name.into(), placement);
        self
    }

    /// Set the radial distortion of the focal plane.
    pub fn with_distortion(mut self, distortion: RadialDistortion) -> Self {
        self.distortion = distortion;
        self
    }

    /// Mirror the focal-plane x axis against RA.
    pub fn with_parity_flip(mut self, parity_flip: bool) -> Self {
        self.parity_flip = parity_flip;
        self
    }

    /// Set the `(ΔRA, ΔDec)` offset of the observed pointing, radians.
    pub fn with_refraction_offset(mut self, dra: f64, ddec: f64) -> Self {
        self.refraction_offset_rad = [dra, ddec];
        self
    }

    /// Placement of `detector`, or an error if the camera does not carry it.
    pub fn placement(&self, detector: &Detector) -> anyhow::Result<&DetectorPlacement> {
        self.detectors
            .get(&detector.name)
            .ok_or_else(|| anyhow!("unknown detector '{}'", detector.name))
    }

    /// Apply the constant refraction offset to a catalog position. Radians.
    fn refract(&self, ra: f64, dec: f64) -> (f64, f64) {
        (
            (ra + self.refraction_offset_rad[0]).rem_euclid(TAU),
            (dec + self.refraction_offset_rad[1]).clamp(-FRAC_PI_2, FRAC_PI_2),
        )
    }

    fn observed_pointing(&self, obs: &ObservationMetadata) -> (f64, f64) {
        self.refract(obs.ra_rad(), obs.dec_rad())
    }

    /// Ideal focal plane → standard coordinates `(ξ, η)` on the sky.
    fn focal_plane_to_standard(&self, fx: f64, fy: f64, rot_sky: f64) -> (f64, f64) {
        let cx = fx * self.plate_scale_rad_per_mm;
        let cy = fy * self.plate_scale_rad_per_mm;
        let cx = if self.parity_flip { -cx } else { cx };
        let (sin_t, cos_t) = rot_sky.sin_cos();
        (cos_t * cx - sin_t * cy, sin_t * cx + cos_t * cy)
    }

    fn standard_to_focal_plane(&self, xi: f64, eta: f64, rot_sky: f64) -> FocalPlanePoint {
        let (sin_t, cos_t) = rot_sky.sin_cos();
        let cx = cos_t * xi + sin_t * eta;
        let cy = -sin_t * xi + cos_t * eta;
        let cx = if self.parity_flip { -cx } else { cx };
        (
            cx / self.plate_scale_rad_per_mm,
            cy / self.plate_scale_rad_per_mm,
        )
    }
}

impl Astrometry for SimulatedCamera {
    fn pixel_to_sky(
        &self,
        pixels: &[(f64, f64)],
        detector: &Detector,
        obs: &ObservationMetadata,
        _epoch: f64,
        apply_distortion: bool,
    ) -> anyhow::Result<Vec<(f64, f64)>> {
        let placement = self.placement(detector)?;
        let (ra0, dec0) = self.observed_pointing(obs);
        let rot_sky = obs.rot_sky_pos_deg.to_radians();

        Ok(pixels
            .iter()
            .map(|&(x, y)| {
                let (fx, fy) = placement.pixel_to_focal_plane(x, y);
                let (fx, fy) = if apply_distortion {
                    self.distortion.undistort(fx, fy)
                } else {
                    (fx, fy)
                };
                let (xi, eta) = self.focal_plane_to_standard(fx, fy, rot_sky);
                inverse_tan_project(xi, eta, ra0, dec0)
            })
            .collect())
    }

    fn sky_to_pixel(
        &self,
        sky: &[(f64, f64)],
        detector: &Detector,
        obs: &ObservationMetadata,
        _epoch: f64,
        apply_distortion: bool,
    ) -> anyhow::Result<Vec<(f64, f64)>> {
        let placement = self.placement(detector)?;
        let (ra0, dec0) = self.observed_pointing(obs);
        let rot_sky = obs.rot_sky_pos_deg.to_radians();

        sky.iter()
            .map(|&(ra, dec)| {
                let Some((xi, eta)) = tan_project(ra, dec, ra0, dec0) else {
                    bail!(
                        "({:.6}°, {:.6}°) is behind the focal plane",
                        ra.to_degrees(),
                        dec.to_degrees()
                    );
                };
                let (fx, fy) = self.standard_to_focal_plane(xi, eta, rot_sky);
                let (fx, fy) = if apply_distortion {
                    self.distortion.distort(fx, fy)
                } else {
                    (fx, fy)
                };
                Ok(placement.focal_plane_to_pixel(fx, fy))
            })
            .collect()
    }

    fn observed_from_icrs(
        &self,
        ra: f64,
        dec: f64,
        _obs: &ObservationMetadata,
        _epoch: f64,
    ) -> anyhow::Result<(f64, f64)> {
        Ok(self.refract(ra, dec))
    }
}

impl CameraGeometry for SimulatedCamera {
    type DistortedWcs = DistortedTanWcs;

    fn detector_corners(&self, detector: &Detector) -> anyhow::Result<[FocalPlanePoint; 4]> {
        let placement = self.placement(detector)?;
        let w = detector.width as f64;
        let h = detector.height as f64;
        Ok([
            placement.pixel_to_focal_plane(0.0, 0.0),
            placement.pixel_to_focal_plane(w, 0.0),
            placement.pixel_to_focal_plane(w, h),
            placement.pixel_to_focal_plane(0.0, h),
        ])
    }

    fn focal_plane_to_tan_pixels(
        &self,
        point: FocalPlanePoint,
        detector: &Detector,
    ) -> anyhow::Result<(f64, f64)> {
        let placement = self.placement(detector)?;
        let (fx, fy) = self.distortion.undistort(point.0, point.1);
        Ok(placement.focal_plane_to_pixel(fx, fy))
    }

    fn attach_distortion(&self, exposure: &SyntheticExposure) -> anyhow::Result<DistortedTanWcs> {
        let placement = *self.placement(&exposure.detector)?;
        Ok(DistortedTanWcs {
            seed: exposure.wcs,
            placement,
            distortion: self.distortion,
            width: exposure.width,
            height: exposure.height,
        })
    }
}

/// TAN WCS evaluated on raw detector pixels through the camera's distortion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistortedTanWcs {
    /// Undistorted TAN WCS in tangent pixels.
    pub seed: TanWcsParameters,
    /// Where the detector sits in the focal plane.
    pub placement: DetectorPlacement,
    /// The camera's focal-plane distortion.
    pub distortion: RadialDistortion,
    /// Detector size in pixels.
    pub width: u32,
    pub height: u32,
}

impl DistortedTanWcs {
    /// Raw pixel → tangent pixel.
    pub fn tan_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let (fx, fy) = self.placement.pixel_to_focal_plane(x, y);
        let (fx, fy) = self.distortion.undistort(fx, fy);
        self.placement.focal_plane_to_pixel(fx, fy)
    }

    /// Raw pixel → (RA, Dec) in degrees.
    pub fn pixel_to_sky(&self, x: f64, y: f64) -> crate::Result<(f64, f64)> {
        let (tx, ty) = self.tan_pixel(x, y);
        self.seed.pixel_to_sky(tx, ty)
    }

    /// (RA, Dec) in degrees → raw pixel.
    pub fn sky_to_pixel(&self, ra_deg: f64, dec_deg: f64) -> crate::Result<(f64, f64)> {
        let (tx, ty) = self.seed.sky_to_pixel(ra_deg, dec_deg)?;
        let (fx, fy) = self.placement.pixel_to_focal_plane(tx, ty);
        let (fx, fy) = self.distortion.distort(fx, fy);
        Ok(self.placement.focal_plane_to_pixel(fx, fy))
    }
}
