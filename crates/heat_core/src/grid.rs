//! Grid geometry, temperature fields and the double-buffered grid state.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::{HeatError, Result};
use crate::Scalar;

/// Regular `nx × ny` lattice over `[0, lx] × [0, ly]`.
///
/// Cells are stored row-major with `i` (the x index) selecting the row and `j`
/// (the y index) the column, so `(i, j)` lives at `i * ny + j`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub nx: usize,
    pub ny: usize,
    pub extent: DVec2,
}

impl GridGeometry {
    /// Builds a geometry, rejecting grids without at least one interior row and column.
    pub fn new(nx: usize, ny: usize, extent: DVec2) -> Result<Self> {
        if nx < 3 || ny < 3 {
            return Err(HeatError::configuration(format!(
                "grid {nx}x{ny} has no interior points (need nx, ny >= 3)"
            )));
        }
        if !(extent.x.is_finite() && extent.y.is_finite() && extent.x > 0.0 && extent.y > 0.0) {
            return Err(HeatError::configuration(format!(
                "domain extent must be finite and positive, got {}x{}",
                extent.x, extent.y
            )));
        }
        Ok(Self { nx, ny, extent })
    }

    /// `(dx, dy)` with `dx = lx / (nx - 1)`.
    pub fn spacing(&self) -> DVec2 {
        DVec2::new(
            self.extent.x / (self.nx - 1) as Scalar,
            self.extent.y / (self.ny - 1) as Scalar,
        )
    }

    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of cells updated per step.
    pub fn interior_cells(&self) -> usize {
        (self.nx - 2) * (self.ny - 2)
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.ny + j
    }

    #[inline]
    pub fn is_boundary(&self, i: usize, j: usize) -> bool {
        i == 0 || j == 0 || i == self.nx - 1 || j == self.ny - 1
    }

    /// Physical coordinates of cell `(i, j)`.
    pub fn position(&self, i: usize, j: usize) -> DVec2 {
        DVec2::new(i as Scalar, j as Scalar) * self.spacing()
    }

    pub fn center(&self) -> DVec2 {
        self.extent * 0.5
    }
}

/// Initial temperature distribution, evaluated identically for every backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitialCondition {
    /// `amplitude · exp(-sharpness · |p - center|²)`; `center` defaults to the domain midpoint.
    Gaussian {
        amplitude: Scalar,
        sharpness: Scalar,
        center: Option<DVec2>,
    },
    Uniform { value: Scalar },
}

impl Default for InitialCondition {
    fn default() -> Self {
        InitialCondition::Gaussian {
            amplitude: 1.0,
            sharpness: 50.0,
            center: None,
        }
    }
}

impl InitialCondition {
    pub fn evaluate(&self, geometry: &GridGeometry, point: DVec2) -> Scalar {
        match *self {
            InitialCondition::Gaussian {
                amplitude,
                sharpness,
                center,
            } => {
                let offset = point - center.unwrap_or_else(|| geometry.center());
                amplitude * (-sharpness * offset.length_squared()).exp()
            }
            InitialCondition::Uniform { value } => value,
        }
    }

    pub fn field(&self, geometry: &GridGeometry) -> Field {
        let mut values = Vec::with_capacity(geometry.len());
        for i in 0..geometry.nx {
            for j in 0..geometry.ny {
                values.push(self.evaluate(geometry, geometry.position(i, j)));
            }
        }
        Field {
            nx: geometry.nx,
            ny: geometry.ny,
            values,
        }
    }
}

/// Immutable snapshot of a temperature field in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    nx: usize,
    ny: usize,
    values: Vec<Scalar>,
}

impl Field {
    pub fn new(nx: usize, ny: usize, values: Vec<Scalar>) -> Result<Self> {
        if values.len() != nx * ny {
            return Err(HeatError::configuration(format!(
                "field of shape {nx}x{ny} needs {} values, got {}",
                nx * ny,
                values.len()
            )));
        }
        Ok(Self { nx, ny, values })
    }

    pub fn zeros(nx: usize, ny: usize) -> Self {
        Self {
            nx,
            ny,
            values: vec![0.0; nx * ny],
        }
    }

    /// `(rows, columns)`, i.e. `(nx, ny)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    pub fn get(&self, i: usize, j: usize) -> Scalar {
        self.values[i * self.ny + j]
    }

    pub fn row(&self, i: usize) -> &[Scalar] {
        &self.values[i * self.ny..(i + 1) * self.ny]
    }

    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [Scalar] {
        &mut self.values
    }

    pub fn into_values(self) -> Vec<Scalar> {
        self.values
    }

    /// Value at `(nx / 2, ny / 2)`, the probe reported on stdout.
    pub fn center_value(&self) -> Scalar {
        self.get(self.nx / 2, self.ny / 2)
    }

    /// Largest `|u|`, or NaN if any value is NaN.
    pub fn max_abs(&self) -> Scalar {
        self.values.iter().fold(0.0, |acc: Scalar, v| {
            if v.is_nan() || acc.is_nan() {
                Scalar::NAN
            } else {
                acc.max(v.abs())
            }
        })
    }
}

/// Two storage arenas for the field plus the parity bit selecting the current one.
///
/// A step always reads `current()` and writes the other arena; `flip` hands the
/// freshly written arena over as the next step's input. Arenas may be host
/// vectors or handles to device-resident buffers.
#[derive(Debug)]
pub struct GridState<A = Vec<Scalar>> {
    geometry: GridGeometry,
    arenas: [A; 2],
    parity: usize,
}

impl<A> GridState<A> {
    pub fn from_arenas(geometry: GridGeometry, arenas: [A; 2]) -> Self {
        Self {
            geometry,
            arenas,
            parity: 0,
        }
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn parity(&self) -> usize {
        self.parity
    }

    pub fn current(&self) -> &A {
        &self.arenas[self.parity]
    }

    /// `(current, next)`: the read-only input and the write target of the next step.
    pub fn split(&mut self) -> (&A, &mut A) {
        let [first, second] = &mut self.arenas;
        if self.parity == 0 {
            (&*first, second)
        } else {
            (&*second, first)
        }
    }

    pub fn flip(&mut self) {
        self.parity ^= 1;
    }
}
