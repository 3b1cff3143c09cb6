//! Single-threaded reference engine.

use super::{unbound, update_row, BoundStencil, StencilEngine};
use crate::error::Result;
use crate::grid::Field;
use crate::params::{PhysicalParameters, StencilCoefficients};
use crate::run::BackendKind;
use crate::Scalar;

/// One loop over the rows of the grid, no concurrency.
#[derive(Debug, Default)]
pub struct SerialEngine {
    bound: Option<BoundStencil>,
}

impl SerialEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Computes one full step of an `nx × ny` field from `input` into `output`.
pub fn apply_stencil(
    input: &[Scalar],
    output: &mut [Scalar],
    nx: usize,
    ny: usize,
    c: &StencilCoefficients,
) {
    debug_assert_eq!(input.len(), nx * ny);
    debug_assert_eq!(output.len(), nx * ny);
    for (i, out_row) in output.chunks_mut(ny).enumerate() {
        update_row(input, out_row, i, nx, ny, c);
    }
}

impl StencilEngine for SerialEngine {
    type Arena = Vec<Scalar>;

    fn kind(&self) -> BackendKind {
        BackendKind::Serial
    }

    fn workers(&self) -> usize {
        1
    }

    fn allocate(&mut self, initial: &Field, params: &PhysicalParameters) -> Result<[Vec<Scalar>; 2]> {
        self.bound = Some(BoundStencil::new(initial, params)?);
        Ok([initial.values().to_vec(), initial.values().to_vec()])
    }

    fn step(&mut self, current: &Vec<Scalar>, next: &mut Vec<Scalar>) -> Result<()> {
        let bound = self.bound.ok_or_else(|| unbound(self.kind()))?;
        apply_stencil(current, next, bound.nx, bound.ny, &bound.coefficients);
        Ok(())
    }

    fn read_back(&mut self, arena: &Vec<Scalar>) -> Result<Field> {
        let bound = self.bound.ok_or_else(|| unbound(self.kind()))?;
        Field::new(bound.nx, bound.ny, arena.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridGeometry;
    use glam::DVec2;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_field(nx: usize, ny: usize, seed: u64) -> Vec<Scalar> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..nx * ny).map(|_| rng.gen_range(-1.0..=1.0)).collect()
    }

    fn coefficients(nx: usize, ny: usize) -> StencilCoefficients {
        let g = GridGeometry::new(nx, ny, DVec2::ONE).unwrap();
        PhysicalParameters::derive(&g, 1e-4, 0.1).unwrap().coefficients()
    }

    #[test]
    fn matches_hand_written_formula() {
        let (nx, ny) = (7, 9);
        let c = coefficients(nx, ny);
        let input = random_field(nx, ny, 7);
        let mut output = vec![0.0; nx * ny];
        apply_stencil(&input, &mut output, nx, ny, &c);
        for i in 1..nx - 1 {
            for j in 1..ny - 1 {
                let u = |a: usize, b: usize| input[a * ny + b];
                let uxx = (u(i + 1, j) - 2.0 * u(i, j) + u(i - 1, j)) / c.dx2;
                let uyy = (u(i, j + 1) - 2.0 * u(i, j) + u(i, j - 1)) / c.dy2;
                let expected = u(i, j) + c.alpha_dt * (uxx + uyy);
                assert_eq!(output[i * ny + j], expected);
            }
        }
    }

    #[test]
    fn boundary_is_bit_identical() {
        let (nx, ny) = (6, 11);
        let c = coefficients(nx, ny);
        let input = random_field(nx, ny, 11);
        let mut output = vec![Scalar::NAN; nx * ny];
        apply_stencil(&input, &mut output, nx, ny, &c);
        for i in 0..nx {
            for j in 0..ny {
                if i == 0 || j == 0 || i == nx - 1 || j == ny - 1 {
                    assert_eq!(output[i * ny + j].to_bits(), input[i * ny + j].to_bits());
                }
            }
        }
    }

    #[test]
    fn update_depends_only_on_five_point_neighbourhood() {
        let (nx, ny) = (9, 9);
        let c = coefficients(nx, ny);
        let base = random_field(nx, ny, 3);
        let mut base_out = vec![0.0; nx * ny];
        apply_stencil(&base, &mut base_out, nx, ny, &c);

        let (pi, pj) = (4, 5);
        let mut perturbed = base.clone();
        perturbed[pi * ny + pj] += 0.5;
        let mut perturbed_out = vec![0.0; nx * ny];
        apply_stencil(&perturbed, &mut perturbed_out, nx, ny, &c);

        for i in 0..nx {
            for j in 0..ny {
                let neighbour = (i == pi && j.abs_diff(pj) <= 1) || (j == pj && i.abs_diff(pi) <= 1);
                let changed = base_out[i * ny + j] != perturbed_out[i * ny + j];
                assert_eq!(changed, neighbour, "cell ({i},{j})");
            }
        }
    }

    #[test]
    fn engine_requires_allocate() {
        let mut engine = SerialEngine::new();
        let a = vec![0.0; 9];
        let mut b = vec![0.0; 9];
        assert!(engine.step(&a, &mut b).is_err());
    }
}
