//! Error type shared by the rotation transform and the TAN WCS fit.

use thiserror::Error;

/// Result alias for fallible transforms and fits.
pub type Result<T> = std::result::Result<T, WcsError>;

/// Why a transform or fit could not produce a result.
#[derive(Debug, Error)]
pub enum WcsError {
    /// Two coordinate batches that must be element-aligned have different lengths.
    #[error("coordinate batch length mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Pointing is not a finite position on the sphere.
    #[error("invalid pointing (ra={ra}, dec={dec} rad): {reason}")]
    InvalidPointing {
        ra: f64,
        dec: f64,
        reason: &'static str,
    },

    #[error("invalid fit configuration: {0}")]
    InvalidConfig(String),

    /// The detector's tangent-pixel bounding box has no area to sample.
    #[error("degenerate tangent-pixel extent for detector '{detector}' ({width} x {height} px)")]
    DegenerateExtent {
        detector: String,
        width: f64,
        height: f64,
    },

    /// A sample lies on or beyond 90° from the pointing, where TAN is undefined.
    #[error("sample {index} is not in front of the tangent plane (native lat = {lat_deg}°)")]
    BehindTangentPlane { index: usize, lat_deg: f64 },

    /// A sky position handed to the linear model is 90° or more from CRVAL.
    #[error("({ra_deg}°, {dec_deg}°) is not in front of the tangent plane (native lat = {lat_deg}°)")]
    OutsideTangentPlane {
        ra_deg: f64,
        dec_deg: f64,
        lat_deg: f64,
    },

    /// The CD-matrix normal equations are singular or ill-conditioned.
    #[error("singular normal equations in CD fit (determinant = {determinant:e})")]
    SingularFit { determinant: f64 },

    /// The CD matrix has no inverse.
    #[error("CD matrix is not invertible (determinant = {determinant:e})")]
    NonInvertibleCd { determinant: f64 },

    /// Failure reported by the camera-geometry / astrometry collaborator.
    #[error(transparent)]
    Service(#[from] anyhow::Error),
}

impl WcsError {
    pub(crate) fn check_len(expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(WcsError::ShapeMismatch { expected, actual })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_len() {
        assert!(WcsError::check_len(3, 3).is_ok());
        match WcsError::check_len(3, 2) {
            Err(WcsError::ShapeMismatch { expected, actual }) => {
                assert_eq!((expected, actual), (3, 2));
            }
            other => panic!("expected ShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_service_error_is_transparent() {
        let err: WcsError = anyhow::anyhow!("unknown detector 'R:9,9 S:2,2'").into();
        assert_eq!(err.to_string(), "unknown detector 'R:9,9 S:2,2'");
    }
}
