//! Two-term radial focal-plane distortion: `r_d = r·(1 + k1·r² + k2·r⁴)`.
//!
//! Coordinates are focal-plane units (mm) about the optical axis.

/// Radial distortion coefficients. The default is distortion-free.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RadialDistortion {
    /// Cubic coefficient, mm⁻².
    pub k1: f64,
    /// Quintic coefficient, mm⁻⁴.
    pub k2: f64,
}

impl RadialDistortion {
    /// Distortion with coefficients `k1`, `k2`.
    pub fn new(k1: f64, k2: f64) -> Self {
        Self { k1, k2 }
    }

    /// True when both coefficients are zero.
    pub fn is_zero(&self) -> bool {
        self.k1 == 0.0 && self.k2 == 0.0
    }

    /// Ideal → distorted.
    pub fn distort(&self, x: f64, y: f64) -> (f64, f64) {
        let r2 = x * x + y * y;
        let scale = 1.0 + self.k1 * r2 + self.k2 * r2 * r2;
        (x * scale, y * scale)
    }

    /// Distorted → ideal, by Newton iteration on the radius.
    pub fn undistort(&self, x_d: f64, y_d: f64) -> (f64, f64) {
        let r_d = x_d.hypot(y_d);
        if self.is_zero() || r_d < 1e-12 {
            return (x_d, y_d);
        }

        let mut r = r_d;
        for _ in 0..30 {
            let r2 = r * r;
            let f = r * (1.0 + self.k1 * r2 + self.k2 * r2 * r2) - r_d;
            let df = 1.0 + 3.0 * self.k1 * r2 + 5.0 * self.k2 * r2 * r2;
            let step = f / df;
            r -= step;
            if step.abs() < 1e-14 * r_d.max(1.0) {
                break;
            }
        }

        let scale = r / r_d;
        (x_d * scale, y_d * scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undistort_inverts_distort() {
        let d = RadialDistortion::new(-2e-6, 3e-12);
        for &(x, y) in &[(10.0, -20.0), (150.0, 80.0), (0.0, 300.0), (-250.0, -250.0)] {
            let (xd, yd) = d.distort(x, y);
            let (xu, yu) = d.undistort(xd, yd);
            assert!(
                (xu - x).abs() < 1e-9 && (yu - y).abs() < 1e-9,
                "({}, {}) -> ({}, {})",
                x,
                y,
                xu,
                yu
            );
        }
    }

    #[test]
    fn test_zero_is_identity() {
        let d = RadialDistortion::default();
        assert!(d.is_zero());
        assert_eq!(d.distort(12.0, 5.0), (12.0, 5.0));
        assert_eq!(d.undistort(12.0, 5.0), (12.0, 5.0));
    }

    #[test]
    fn test_barrel_pulls_inward() {
        let d = RadialDistortion::new(-1e-6, 0.0);
        let (xd, _) = d.distort(200.0, 0.0);
        assert!(xd < 200.0);
    }
}
