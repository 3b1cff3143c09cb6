//! The stencil update contract and its CPU implementations.
//!
//! Every engine advances the field by one explicit step, reading only the
//! current arena and writing only the next one:
//!
//! ```text
//! U'[i,j] = U[i,j] + alpha·dt·( (U[i+1,j] - 2U[i,j] + U[i-1,j]) / dx²
//!                             + (U[i,j+1] - 2U[i,j] + U[i,j-1]) / dy² )
//! ```
//!
//! Boundary cells are copied through unchanged.

use crate::error::{HeatError, Result};
use crate::grid::Field;
use crate::params::{PhysicalParameters, StencilCoefficients};
use crate::run::BackendKind;
use crate::Scalar;

pub mod serial;
pub mod threaded;

pub use serial::SerialEngine;
pub use threaded::ThreadedEngine;

/// One interchangeable execution strategy for the explicit step.
///
/// `Arena` is whatever holds one copy of the field: a host vector for the CPU
/// engines, a handle to a device buffer for the GPU ones. The time stepper owns
/// the two arenas and alternates them; an engine never writes the arena it reads.
pub trait StencilEngine {
    type Arena;

    fn kind(&self) -> BackendKind;

    /// Threads, or parallel execution units per dispatch, reported with the result.
    fn workers(&self) -> usize;

    /// Creates both arenas holding `initial` and binds the run's parameters.
    fn allocate(
        &mut self,
        initial: &Field,
        params: &PhysicalParameters,
    ) -> Result<[Self::Arena; 2]>;

    /// Computes `next` from `current`.
    fn step(&mut self, current: &Self::Arena, next: &mut Self::Arena) -> Result<()>;

    /// Blocks until all queued work has completed. A no-op for synchronous engines.
    fn synchronize(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_back(&mut self, arena: &Self::Arena) -> Result<Field>;
}

/// Shape and coefficients captured by `allocate`.
#[derive(Debug, Clone, Copy)]
pub struct BoundStencil {
    pub nx: usize,
    pub ny: usize,
    pub coefficients: StencilCoefficients,
}

impl BoundStencil {
    pub fn new(initial: &Field, params: &PhysicalParameters) -> Result<Self> {
        let (nx, ny) = initial.shape();
        if nx < 3 || ny < 3 {
            return Err(HeatError::configuration(format!(
                "grid {nx}x{ny} has no interior points"
            )));
        }
        Ok(Self {
            nx,
            ny,
            coefficients: params.coefficients(),
        })
    }

    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn unbound(kind: BackendKind) -> HeatError {
    HeatError::configuration(format!("{kind} engine stepped before allocate"))
}

/// New value of the interior cell at flat index `idx`; `stride` is the row length.
#[inline]
pub fn update_cell(input: &[Scalar], idx: usize, stride: usize, c: &StencilCoefficients) -> Scalar {
    let u = input[idx];
    let uxx = (input[idx + stride] - 2.0 * u + input[idx - stride]) / c.dx2;
    let uyy = (input[idx + 1] - 2.0 * u + input[idx - 1]) / c.dy2;
    u + c.alpha_dt * (uxx + uyy)
}

/// Writes row `i` of the next field into `out_row`, copying boundary cells.
#[inline]
pub fn update_row(
    input: &[Scalar],
    out_row: &mut [Scalar],
    i: usize,
    nx: usize,
    ny: usize,
    c: &StencilCoefficients,
) {
    let base = i * ny;
    if i == 0 || i == nx - 1 {
        out_row.copy_from_slice(&input[base..base + ny]);
        return;
    }
    out_row[0] = input[base];
    out_row[ny - 1] = input[base + ny - 1];
    for j in 1..ny - 1 {
        out_row[j] = update_cell(input, base + j, ny, c);
    }
}
