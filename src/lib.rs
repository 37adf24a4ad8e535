//! # tanwcs
//!
//! Native-frame sky rotations and linear **TAN WCS fitting** for detector pixel grids.
//!
//! Given a camera that can map detector pixels to undistorted sky positions, `tanwcs`
//! derives the standard tangent-plane World Coordinate System for a detector:
//! reference pixel (CRPIX), reference sky position (CRVAL) and the 2×2 CD matrix.
//! The focal plane is approximated as distortion-free; the camera can then build
//! a distortion-aware WCS from the fitted seed.
//!
//! ## Example
//!
//! ```
//! use tanwcs::{
//!     fit_tan_wcs, Detector, DetectorPlacement, ObservationMetadata, SimulatedCamera,
//!     TanFitConfig,
//! };
//!
//! let detector = Detector::new("R:2,2 S:1,1", 4000, 4072);
//! let camera = SimulatedCamera::new(10_000.0).with_detector(
//!     detector.name.clone(),
//!     DetectorPlacement::centered([0.0, 0.0], 0.01, 4000, 4072),
//! );
//! let obs = ObservationMetadata {
//!     ra_deg: 25.0,
//!     dec_deg: -10.0,
//!     rot_sky_pos_deg: 0.0,
//!     mjd: 49250.0,
//! };
//!
//! let wcs = fit_tan_wcs(&detector, &camera, &obs, 2000.0, &TanFitConfig::default()).unwrap();
//! for (keyword, value) in wcs.header_cards() {
//!     println!("{keyword:8} = {value:?}");
//! }
//! ```
//!
//! ## Algorithm overview
//!
//! 1. **Extent**: transform the detector's focal-plane corners to undistorted
//!    tangent pixels and take the bounding box
//! 2. **Sampling**: ask the camera for the sky position of a coarse grid of tangent
//!    pixels (3×3 by default)
//! 3. **Reference point**: CRVAL is the refraction-corrected pointing, CRPIX its
//!    pixel position on the detector
//! 4. **Native frame**: rotate each sample into the frame whose pole is the pointing
//!    ([`native`]) and project gnomonically to intermediate world coordinates
//! 5. **Linear fit**: solve the decoupled 2×2 normal equations for the CD matrix
//!
//! Angles at the public boundary ([`TanWcsParameters`], `_deg` helpers) are degrees;
//! everything else is radians.

pub mod camera;
mod error;
pub mod native;
pub mod projection;
pub mod wcs;

pub use camera::{
    Astrometry, CameraGeometry, Detector, DetectorPlacement, DistortedTanWcs,
    ObservationMetadata, RadialDistortion, SimulatedCamera, SyntheticExposure,
};
pub use error::{Result, WcsError};
pub use native::{
    native_to_sky, native_to_sky_batch, native_to_sky_deg, sky_to_native, sky_to_native_batch,
    sky_to_native_deg, Pointing,
};
pub use wcs::fit::{
    fit_cd_matrix, fit_tan_wcs, fit_tan_wcs_with_distortion, projection_extent, PixelSample,
    ProjectionExtent, TanFitConfig,
};
pub use wcs::{HeaderCard, HeaderValue, TanWcsParameters};
