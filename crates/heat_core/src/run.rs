//! Immutable run descriptions and finished run results.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::error::{HeatError, Result};
use crate::grid::{Field, GridGeometry, InitialCondition};
use crate::params::PhysicalParameters;
use crate::Scalar;

/// Execution strategy of a stencil engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Serial,
    Threaded,
    Gpu,
    Hybrid,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Serial,
        BackendKind::Threaded,
        BackendKind::Gpu,
        BackendKind::Hybrid,
    ];

    /// Identifier used as result-file prefix and executable stem.
    pub fn method(self) -> &'static str {
        match self {
            BackendKind::Serial => "serial",
            BackendKind::Threaded => "threaded",
            BackendKind::Gpu => "gpu",
            BackendKind::Hybrid => "hybrid",
        }
    }

    /// Name printed on the `Implementation:` line.
    pub fn display_name(self) -> &'static str {
        match self {
            BackendKind::Serial => "Serial",
            BackendKind::Threaded => "Threaded",
            BackendKind::Gpu => "GPU",
            BackendKind::Hybrid => "Hybrid",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for BackendKind {
    type Err = HeatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" => Ok(BackendKind::Serial),
            "threaded" | "openmp" => Ok(BackendKind::Threaded),
            "gpu" | "cuda" => Ok(BackendKind::Gpu),
            "hybrid" => Ok(BackendKind::Hybrid),
            other => Err(HeatError::configuration(format!("unknown backend '{other}'"))),
        }
    }
}

/// Grid, physics, step count and backend of one run. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRun {
    geometry: GridGeometry,
    params: PhysicalParameters,
    steps: u64,
    backend: BackendKind,
    initial: InitialCondition,
}

impl SimulationRun {
    pub fn new(
        geometry: GridGeometry,
        params: PhysicalParameters,
        steps: u64,
        backend: BackendKind,
        initial: InitialCondition,
    ) -> Self {
        Self {
            geometry,
            params,
            steps,
            backend,
            initial,
        }
    }

    pub fn from_config(config: &SimulationConfig, backend: BackendKind) -> Result<Self> {
        config.validate()?;
        let geometry = config.geometry()?;
        let params = PhysicalParameters::derive(&geometry, config.alpha, config.safety)?;
        Ok(Self::new(geometry, params, config.nt, backend, config.initial))
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn params(&self) -> &PhysicalParameters {
        &self.params
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn initial_field(&self) -> Field {
        self.initial.field(&self.geometry)
    }

    /// `Nt · dt`.
    pub fn final_time(&self) -> Scalar {
        self.steps as Scalar * self.params.dt
    }

    /// Total lattice updates, `Nt · (Nx-2) · (Ny-2)`.
    pub fn lattice_updates(&self) -> Scalar {
        self.steps as Scalar * self.geometry.interior_cells() as Scalar
    }
}

/// Million lattice updates per second; zero when no time elapsed.
pub fn throughput_mlups(updates: Scalar, elapsed: Duration) -> Scalar {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        updates / secs / 1e6
    } else {
        0.0
    }
}

/// Metadata attached to a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub backend: BackendKind,
    pub nx: usize,
    pub ny: usize,
    pub steps: u64,
    pub final_time: Scalar,
    /// Threads for CPU backends, parallel execution units per dispatch for the GPU.
    pub workers: usize,
    pub elapsed_secs: Scalar,
    pub throughput_mlups: Scalar,
}

/// Final field snapshot plus its metadata.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub field: Field,
    pub metadata: RunMetadata,
}

impl RunResult {
    pub fn new(run: &SimulationRun, field: Field, workers: usize, elapsed: Duration) -> Self {
        let metadata = RunMetadata {
            backend: run.backend(),
            nx: run.geometry().nx,
            ny: run.geometry().ny,
            steps: run.steps(),
            final_time: run.final_time(),
            workers,
            elapsed_secs: elapsed.as_secs_f64(),
            throughput_mlups: throughput_mlups(run.lattice_updates(), elapsed),
        };
        Self { field, metadata }
    }
}
