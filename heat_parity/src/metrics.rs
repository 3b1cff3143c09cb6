//! Elementwise error maps and their aggregate metrics.

use heat_core::{Field, HeatError, Result};
use serde::Serialize;

/// Reference magnitudes at or below this get a relative error of zero.
pub const RELATIVE_ERROR_FLOOR: f64 = 1e-15;

/// Row-major per-cell error values with the grid's shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorMap {
    nx: usize,
    ny: usize,
    values: Vec<f64>,
}

impl ErrorMap {
    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.ny + j]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn rows(&self) -> std::slice::ChunksExact<'_, f64> {
        self.values.chunks_exact(self.ny)
    }

    /// Largest error, or NaN if any cell is NaN.
    pub fn max(&self) -> f64 {
        self.values.iter().fold(0.0, |acc: f64, &v| {
            if v.is_nan() || acc.is_nan() {
                f64::NAN
            } else {
                acc.max(v)
            }
        })
    }

    pub fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}

/// Aggregates over the full error maps; absolute metrics are the primary signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub max_abs_error: f64,
    pub mean_abs_error: f64,
    pub max_rel_error: f64,
    pub mean_rel_error: f64,
    /// Population standard deviation of the absolute error.
    pub std_abs_error: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub metrics: ErrorMetrics,
    pub abs_error: ErrorMap,
    pub rel_error: ErrorMap,
}

/// Compares `candidate` against `reference` cell by cell.
pub fn compare(reference: &Field, candidate: &Field) -> Result<Comparison> {
    if reference.shape() != candidate.shape() {
        return Err(HeatError::ShapeMismatch {
            expected: reference.shape(),
            found: candidate.shape(),
        });
    }
    let (nx, ny) = reference.shape();
    let n = (nx * ny) as f64;

    let mut abs = Vec::with_capacity(nx * ny);
    let mut rel = Vec::with_capacity(nx * ny);
    let mut sq_sum = 0.0;
    for (&r, &c) in reference.values().iter().zip(candidate.values()) {
        let diff = r - c;
        let a = diff.abs();
        sq_sum += diff * diff;
        abs.push(a);
        rel.push(if r.abs() > RELATIVE_ERROR_FLOOR { a / r.abs() } else { 0.0 });
    }

    let abs_error = ErrorMap { nx, ny, values: abs };
    let rel_error = ErrorMap { nx, ny, values: rel };
    let mse = sq_sum / n;
    let mean_abs_error = abs_error.mean();
    let variance = abs_error
        .values
        .iter()
        .map(|a| (a - mean_abs_error).powi(2))
        .sum::<f64>()
        / n;

    Ok(Comparison {
        metrics: ErrorMetrics {
            mse,
            rmse: mse.sqrt(),
            max_abs_error: abs_error.max(),
            mean_abs_error,
            max_rel_error: rel_error.max(),
            mean_rel_error: rel_error.mean(),
            std_abs_error: variance.sqrt(),
        },
        abs_error,
        rel_error,
    })
}
