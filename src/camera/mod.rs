//! Camera geometry and astrometry collaborators.
//!
//! The WCS fit does not know how a camera maps pixels to the sky. It asks a
//! collaborator through two traits:
//!
//! - [`CameraGeometry`]: detector corners in the focal plane, the focal-plane →
//!   undistorted ("tangent") pixel mapping, and building a distortion-aware WCS
//!   from a seed TAN WCS.
//! - [`Astrometry`]: pixel ↔ sky conversion for a detector and the
//!   refraction-aware observed position of the nominal pointing.
//!
//! All angles crossing these traits are radians. Errors are `anyhow` errors and
//! are passed through to the caller unchanged.
//!
//! [`SimulatedCamera`] is a self-contained implementation of both traits for an
//! ideal pinhole camera.

pub mod radial;
pub mod simulated;

pub use radial::RadialDistortion;
pub use simulated::{DetectorPlacement, DistortedTanWcs, SimulatedCamera};

use crate::wcs::TanWcsParameters;

/// A point in the focal plane, in the camera's focal-plane units (mm).
pub type FocalPlanePoint = (f64, f64);

/// Detector identity and pixel dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Detector {
    /// Name the camera knows the detector by.
    pub name: String,
    /// Width in pixels (columns).
    pub width: u32,
    /// Height in pixels (rows).
    pub height: u32,
}

impl Detector {
    /// Detector `name` of `width` × `height` pixels.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }
}

/// Telescope state for one observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservationMetadata {
    /// Nominal (unrefracted, catalog-frame) pointing RA in degrees.
    pub ra_deg: f64,
    /// Nominal (unrefracted, catalog-frame) pointing Dec in degrees.
    pub dec_deg: f64,
    /// Angle of the sky relative to the camera y axis, degrees.
    pub rot_sky_pos_deg: f64,
    /// Modified Julian date of the observation.
    pub mjd: f64,
}

impl ObservationMetadata {
    /// Nominal pointing RA in radians.
    pub fn ra_rad(&self) -> f64 {
        self.ra_deg.to_radians()
    }

    /// Nominal pointing Dec in radians.
    pub fn dec_rad(&self) -> f64 {
        self.dec_deg.to_radians()
    }
}

/// Minimal stand-in for an exposure: dimensions, a seed WCS and the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticExposure {
    /// Image size in pixels.
    pub width: u32,
    pub height: u32,
    /// Seed TAN WCS fitted for the detector.
    pub wcs: TanWcsParameters,
    pub detector: Detector,
}

/// Focal-plane geometry of a camera.
pub trait CameraGeometry {
    /// WCS produced by [`CameraGeometry::attach_distortion`].
    type DistortedWcs;

    /// The detector's four corners in the focal plane.
    fn detector_corners(&self, detector: &Detector) -> anyhow::Result<[FocalPlanePoint; 4]>;

    /// Map a focal-plane point to the detector's undistorted tangent-pixel system.
    fn focal_plane_to_tan_pixels(
        &self,
        point: FocalPlanePoint,
        detector: &Detector,
    ) -> anyhow::Result<(f64, f64)>;

    /// Build the full distortion-corrected WCS from a seed TAN WCS attached to
    /// a synthetic exposure of the detector.
    fn attach_distortion(&self, exposure: &SyntheticExposure)
        -> anyhow::Result<Self::DistortedWcs>;
}

/// Pixel ↔ sky conversion for the detectors of a camera.
pub trait Astrometry {
    /// Pixel positions on `detector` → (RA, Dec) in radians.
    ///
    /// With `apply_distortion == false` the pixels are read as tangent pixels.
    fn pixel_to_sky(
        &self,
        pixels: &[(f64, f64)],
        detector: &Detector,
        obs: &ObservationMetadata,
        epoch: f64,
        apply_distortion: bool,
    ) -> anyhow::Result<Vec<(f64, f64)>>;

    /// (RA, Dec) in radians → pixel positions on `detector`.
    fn sky_to_pixel(
        &self,
        sky: &[(f64, f64)],
        detector: &Detector,
        obs: &ObservationMetadata,
        epoch: f64,
        apply_distortion: bool,
    ) -> anyhow::Result<Vec<(f64, f64)>>;

    /// Refraction-corrected (observed) position of a catalog RA/Dec, radians.
    fn observed_from_icrs(
        &self,
        ra: f64,
        dec: f64,
        obs: &ObservationMetadata,
        epoch: f64,
    ) -> anyhow::Result<(f64, f64)>;
}
