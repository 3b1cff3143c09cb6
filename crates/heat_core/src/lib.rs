//! Backend-independent core of the explicit 2D heat diffusion solver.
//!
//! - grid geometry, initial conditions and the double-buffered [`GridState`]
//! - physical parameters with the derived, stability-checked time step
//! - the [`StencilEngine`] contract plus the serial and threaded engines
//! - the [`TimeStepper`] loop, result export and the stdout metric lines

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod grid;
pub mod params;
pub mod run;
pub mod stepper;
pub mod summary;

/// Scalar type of every field value.
pub type Scalar = f64;

pub use config::SimulationConfig;
pub use engine::{SerialEngine, StencilEngine, ThreadedEngine};
pub use error::{HeatError, Result};
pub use grid::{Field, GridGeometry, GridState, InitialCondition};
pub use params::{PhysicalParameters, StencilCoefficients};
pub use run::{BackendKind, RunMetadata, RunResult, SimulationRun};
pub use stepper::TimeStepper;
