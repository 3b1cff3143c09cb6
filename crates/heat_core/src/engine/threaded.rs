//! Shared-memory engine: a fixed rayon pool, one band of rows per worker.

use std::ops::Range;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use super::{unbound, update_row, BoundStencil, StencilEngine};
use crate::error::{HeatError, Result};
use crate::grid::Field;
use crate::params::PhysicalParameters;
use crate::run::BackendKind;
use crate::Scalar;

/// Splits `rows` into at most `workers` contiguous, non-empty, disjoint bands.
pub fn row_bands(rows: Range<usize>, workers: usize) -> Vec<Range<usize>> {
    let count = rows.len();
    if count == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, count);
    let base = count / workers;
    let extra = count % workers;
    let mut bands = Vec::with_capacity(workers);
    let mut start = rows.start;
    for w in 0..workers {
        let len = base + usize::from(w < extra);
        bands.push(start..start + len);
        start += len;
    }
    bands
}

/// Computes rows `rows` of the next field on `pool`.
///
/// Each band writes only its own rows of `output` and reads `input` freely,
/// including rows owned by other bands. `install` returns once every band has
/// finished, which is the barrier between steps.
pub fn apply_stencil_rows(
    pool: &ThreadPool,
    workers: usize,
    input: &[Scalar],
    output: &mut [Scalar],
    rows: Range<usize>,
    stencil: &BoundStencil,
) {
    let BoundStencil {
        nx,
        ny,
        coefficients: c,
    } = *stencil;
    let bands = row_bands(rows.clone(), workers);
    let mut regions = Vec::with_capacity(bands.len());
    let mut rest = &mut output[rows.start * ny..rows.end * ny];
    for band in &bands {
        let (head, tail) = rest.split_at_mut(band.len() * ny);
        regions.push((band.start, head));
        rest = tail;
    }

    pool.install(|| {
        regions.into_par_iter().for_each(|(first_row, region)| {
            for (offset, out_row) in region.chunks_mut(ny).enumerate() {
                update_row(input, out_row, first_row + offset, nx, ny, &c);
            }
        });
    });
}

pub struct ThreadedEngine {
    pool: ThreadPool,
    workers: usize,
    bound: Option<BoundStencil>,
}

impl ThreadedEngine {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(HeatError::configuration("threaded engine needs at least one worker"));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|idx| format!("heat-worker-{idx}"))
            .build()
            .map_err(|e| HeatError::configuration(format!("failed to build thread pool: {e}")))?;
        debug!(workers, "threaded engine pool ready");
        Ok(Self {
            pool,
            workers,
            bound: None,
        })
    }

    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }
}

impl StencilEngine for ThreadedEngine {
    type Arena = Vec<Scalar>;

    fn kind(&self) -> BackendKind {
        BackendKind::Threaded
    }

    fn workers(&self) -> usize {
        self.workers
    }

    fn allocate(&mut self, initial: &Field, params: &PhysicalParameters) -> Result<[Vec<Scalar>; 2]> {
        self.bound = Some(BoundStencil::new(initial, params)?);
        Ok([initial.values().to_vec(), initial.values().to_vec()])
    }

    fn step(&mut self, current: &Vec<Scalar>, next: &mut Vec<Scalar>) -> Result<()> {
        let bound = self.bound.ok_or_else(|| unbound(self.kind()))?;
        apply_stencil_rows(
            &self.pool,
            self.workers,
            current,
            next,
            0..bound.nx,
            &bound,
        );
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
    use crate::engine::serial::apply_stencil;
    use crate::grid::GridGeometry;
    use glam::DVec2;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn bands_cover_rows_disjointly() {
        for (rows, workers) in [(0..10, 3), (1..49, 4), (0..2, 8), (5..6, 1), (0..100, 7)] {
            let bands = row_bands(rows.clone(), workers);
            assert!(bands.len() <= workers.max(1));
            assert_eq!(bands.first().map(|b| b.start), Some(rows.start));
            assert_eq!(bands.last().map(|b| b.end), Some(rows.end));
            for pair in bands.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
            let sizes: Vec<usize> = bands.iter().map(|b| b.len()).collect();
            let max = *sizes.iter().max().unwrap();
            let min = *sizes.iter().min().unwrap();
            assert!(min >= 1 && max - min <= 1, "unbalanced bands {sizes:?}");
        }
        assert!(row_bands(3..3, 4).is_empty());
    }

    #[test]
    fn matches_serial_bit_for_bit() {
        let (nx, ny) = (37, 23);
        let g = GridGeometry::new(nx, ny, DVec2::ONE).unwrap();
        let params = PhysicalParameters::derive(&g, 1e-4, 0.2).unwrap();
        let c = params.coefficients();
        let stencil = BoundStencil::new(&Field::zeros(nx, ny), &params).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0x5EED);
        let input: Vec<Scalar> = (0..nx * ny).map(|_| rng.gen_range(0.0..1.0)).collect();

        let mut expected = vec![0.0; nx * ny];
        apply_stencil(&input, &mut expected, nx, ny, &c);

        for workers in [1, 2, 3, 8, 64] {
            let engine = ThreadedEngine::new(workers).unwrap();
            let mut got = vec![0.0; nx * ny];
            apply_stencil_rows(engine.pool(), workers, &input, &mut got, 0..nx, &stencil);
            assert_eq!(got, expected, "workers={workers}");
        }
    }

    #[test]
    fn partial_rows_leave_others_untouched() {
        let (nx, ny) = (10, 5);
        let g = GridGeometry::new(nx, ny, DVec2::ONE).unwrap();
        let params = PhysicalParameters::derive(&g, 1.0, 0.25).unwrap();
        let stencil = BoundStencil::new(&Field::zeros(nx, ny), &params).unwrap();
        let input = vec![1.0; nx * ny];
        let mut output = vec![-7.0; nx * ny];
        let engine = ThreadedEngine::new(2).unwrap();
        apply_stencil_rows(engine.pool(), 2, &input, &mut output, 0..4, &stencil);
        assert!(output[..4 * ny].iter().all(|&v| v == 1.0));
        assert!(output[4 * ny..].iter().all(|&v| v == -7.0));
    }

    #[test]
    fn zero_workers_is_a_configuration_error() {
        assert!(matches!(ThreadedEngine::new(0), Err(HeatError::Configuration(_))));
    }
}
