//! Physical parameters, the derived time step and the stability bound.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::{HeatError, Result};
use crate::grid::GridGeometry;
use crate::Scalar;

/// Analytic bound on `alpha·dt·(1/dx² + 1/dy²)` for the explicit five-point scheme.
pub const STABILITY_LIMIT: Scalar = 0.5;

// Rounding slack so a safety margin of exactly 0.25 on a square grid is accepted.
const STABILITY_SLACK: Scalar = 1e-12;

/// Diffusivity, time step and grid spacing for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalParameters {
    pub alpha: Scalar,
    pub dt: Scalar,
    pub spacing: DVec2,
}

impl PhysicalParameters {
    /// Derives `dt = safety · min(dx², dy²) / alpha` and checks it against the stability bound.
    pub fn derive(geometry: &GridGeometry, alpha: Scalar, safety: Scalar) -> Result<Self> {
        if !(alpha.is_finite() && alpha > 0.0) {
            return Err(HeatError::configuration(format!(
                "diffusivity must be positive, got {alpha}"
            )));
        }
        if !(safety > 0.0 && safety <= STABILITY_LIMIT) {
            return Err(HeatError::configuration(format!(
                "safety margin must lie in (0, {STABILITY_LIMIT}], got {safety}"
            )));
        }
        let spacing = geometry.spacing();
        let h2 = spacing * spacing;
        let dt = safety * h2.x.min(h2.y) / alpha;
        let params = Self { alpha, dt, spacing };
        if !params.is_stable() {
            return Err(HeatError::configuration(format!(
                "derived dt={dt:e} violates the stability bound (number {:.4} > {STABILITY_LIMIT})",
                params.stability_number()
            )));
        }
        Ok(params)
    }

    /// Uses an explicit `dt` without checking stability.
    pub fn with_dt(geometry: &GridGeometry, alpha: Scalar, dt: Scalar) -> Self {
        Self {
            alpha,
            dt,
            spacing: geometry.spacing(),
        }
    }

    /// `alpha·dt·(1/dx² + 1/dy²)`.
    pub fn stability_number(&self) -> Scalar {
        let h2 = self.spacing * self.spacing;
        self.alpha * self.dt * (1.0 / h2.x + 1.0 / h2.y)
    }

    pub fn is_stable(&self) -> bool {
        self.stability_number() <= STABILITY_LIMIT * (1.0 + STABILITY_SLACK)
    }

    pub fn coefficients(&self) -> StencilCoefficients {
        StencilCoefficients {
            alpha_dt: self.alpha * self.dt,
            dx2: self.spacing.x * self.spacing.x,
            dy2: self.spacing.y * self.spacing.y,
        }
    }
}

/// Precomputed factors consumed by every stencil implementation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StencilCoefficients {
    pub alpha_dt: Scalar,
    pub dx2: Scalar,
    pub dy2: Scalar,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(n: usize) -> GridGeometry {
        GridGeometry::new(n, n, DVec2::ONE).unwrap()
    }

    #[test]
    fn derived_dt_matches_formula() {
        let g = geometry(200);
        let p = PhysicalParameters::derive(&g, 1e-4, 0.25).unwrap();
        let dx = 1.0 / 199.0;
        let expected = 0.25 * (dx * dx) / 1e-4;
        assert!((p.dt - expected).abs() <= expected * 1e-14);
        assert!((p.stability_number() - 0.5).abs() < 1e-12);
        assert!(p.is_stable());
    }

    #[test]
    fn anisotropic_spacing_uses_smaller_cell() {
        let g = GridGeometry::new(11, 41, DVec2::ONE).unwrap();
        let p = PhysicalParameters::derive(&g, 1.0, 0.25).unwrap();
        let dy = 1.0 / 40.0;
        assert!((p.dt - 0.25 * dy * dy).abs() < 1e-18);
        assert!(p.stability_number() < STABILITY_LIMIT);
    }

    #[test]
    fn rejects_bad_safety_and_alpha() {
        let g = geometry(10);
        assert!(PhysicalParameters::derive(&g, 1e-4, 0.0).is_err());
        assert!(PhysicalParameters::derive(&g, 1e-4, 0.6).is_err());
        assert!(PhysicalParameters::derive(&g, 0.0, 0.25).is_err());
        assert!(PhysicalParameters::derive(&g, -1.0, 0.25).is_err());
    }

    #[test]
    fn doubled_dt_breaks_bound() {
        let g = geometry(50);
        let stable = PhysicalParameters::derive(&g, 1e-4, 0.25).unwrap();
        let unstable = PhysicalParameters::with_dt(&g, 1e-4, 2.0 * stable.dt);
        assert!(!unstable.is_stable());
    }
}
