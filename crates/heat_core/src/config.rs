//! Run configuration shared by the backend executables.

use std::path::PathBuf;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::{HeatError, Result};
use crate::grid::{GridGeometry, InitialCondition};
use crate::params::{PhysicalParameters, STABILITY_LIMIT};
use crate::Scalar;

/// User-facing settings for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub nx: usize,
    pub ny: usize,
    pub nt: u64,
    pub lx: Scalar,
    pub ly: Scalar,
    pub alpha: Scalar,
    /// Fraction of the stability-limited time step actually used; must lie in `(0, 0.5]`.
    pub safety: Scalar,
    /// Worker count for the threaded and hybrid backends; `None` uses the available parallelism.
    pub threads: Option<usize>,
    /// Share of the rows the hybrid backend hands to the GPU.
    pub gpu_fraction: Scalar,
    pub initial: InitialCondition,
    pub output_dir: PathBuf,
    pub export: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            nx: 200,
            ny: 200,
            nt: 1000,
            lx: 1.0,
            ly: 1.0,
            alpha: 1e-4,
            safety: 0.25,
            threads: None,
            gpu_fraction: 0.5,
            initial: InitialCondition::default(),
            output_dir: PathBuf::from("."),
            export: true,
        }
    }
}

impl SimulationConfig {
    pub fn with_grid(mut self, nx: usize, ny: usize, nt: u64) -> Self {
        self.nx = nx;
        self.ny = ny;
        self.nt = nt;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.geometry()?;
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(HeatError::configuration(format!(
                "alpha must be positive, got {}",
                self.alpha
            )));
        }
        if !(self.safety > 0.0 && self.safety <= STABILITY_LIMIT) {
            return Err(HeatError::configuration(format!(
                "safety must lie in (0, {STABILITY_LIMIT}], got {}",
                self.safety
            )));
        }
        if !(self.gpu_fraction > 0.0 && self.gpu_fraction < 1.0) {
            return Err(HeatError::configuration(format!(
                "gpu_fraction must lie in (0, 1), got {}",
                self.gpu_fraction
            )));
        }
        if self.threads == Some(0) {
            return Err(HeatError::configuration("threads must be at least 1"));
        }
        Ok(())
    }

    pub fn geometry(&self) -> Result<GridGeometry> {
        GridGeometry::new(self.nx, self.ny, DVec2::new(self.lx, self.ly))
    }

    pub fn parameters(&self) -> Result<PhysicalParameters> {
        PhysicalParameters::derive(&self.geometry()?, self.alpha, self.safety)
    }

    /// Configured worker count, falling back to the machine's available parallelism.
    pub fn worker_count(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}
