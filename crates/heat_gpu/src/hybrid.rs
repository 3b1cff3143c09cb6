//! Row-partitioned CPU+GPU engine.
//!
//! Rows `[0, split)` live on the host and are updated by the rayon pool; rows
//! `[split, nx)` are stepped by a [`RowDevice`]. After both sides finish a step,
//! the two rows adjacent to the split are exchanged so the next step's
//! neighbor reads see the other side's completed values:
//!
//! ```text
//!   host rows   0 .. split-1 | split      <- halo downloaded from device
//!   device rows split-1      | split .. nx-1
//!                 ^ halo uploaded from host
//! ```

use std::ops::Range;

use heat_core::engine::threaded::apply_stencil_rows;
use heat_core::engine::{BoundStencil, StencilEngine};
use heat_core::{BackendKind, Field, HeatError, PhysicalParameters, Result, Scalar};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::context::GpuContext;
use crate::engine::{check_pair, unbound, DeviceArena, ARENA_PAIR};
use crate::rows::{RowDevice, WgpuRows};

/// Host copy of the field plus the matching device slot.
#[derive(Debug, Clone)]
pub struct HybridArena {
    host: Vec<Scalar>,
    device: DeviceArena,
}

/// First device row for `nx` rows with `gpu_fraction` of them on the device.
///
/// Each side keeps at least one row.
pub fn split_row(nx: usize, gpu_fraction: f64) -> usize {
    let gpu_rows = (nx as f64 * gpu_fraction).round() as usize;
    nx - gpu_rows.clamp(1, nx.saturating_sub(1).max(1))
}

#[derive(Debug, Clone, Copy)]
struct Partition {
    stencil: BoundStencil,
    split: usize,
}

pub struct HybridEngine<D = WgpuRows> {
    device: D,
    pool: ThreadPool,
    workers: usize,
    gpu_fraction: f64,
    partition: Option<Partition>,
}

impl HybridEngine<WgpuRows> {
    pub fn new(ctx: GpuContext, workers: usize, gpu_fraction: f64) -> Result<Self> {
        Self::with_device(WgpuRows::new(ctx), workers, gpu_fraction)
    }
}

impl<D: RowDevice> HybridEngine<D> {
    pub fn with_device(device: D, workers: usize, gpu_fraction: f64) -> Result<Self> {
        if workers == 0 {
            return Err(HeatError::configuration("hybrid engine needs at least one worker"));
        }
        if !(gpu_fraction > 0.0 && gpu_fraction < 1.0) {
            return Err(HeatError::configuration(format!(
                "gpu fraction {gpu_fraction} must lie strictly between 0 and 1"
            )));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|idx| format!("heat-hybrid-{idx}"))
            .build()
            .map_err(|e| HeatError::configuration(format!("failed to build thread pool: {e}")))?;
        Ok(Self {
            device,
            pool,
            workers,
            gpu_fraction,
            partition: None,
        })
    }

    /// Rows updated on the host and on the device, once allocated.
    pub fn partition(&self) -> Option<(Range<usize>, Range<usize>)> {
        self.partition
            .map(|p| (0..p.split, p.split..p.stencil.nx))
    }
}

impl<D: RowDevice> StencilEngine for HybridEngine<D> {
    type Arena = HybridArena;

    fn kind(&self) -> BackendKind {
        BackendKind::Hybrid
    }

    /// Host worker threads; the device counts as a single unit alongside them.
    fn workers(&self) -> usize {
        self.workers
    }

    fn allocate(&mut self, initial: &Field, params: &PhysicalParameters) -> Result<[HybridArena; 2]> {
        let stencil = BoundStencil::new(initial, params)?;
        let split = split_row(stencil.nx, self.gpu_fraction);
        self.device.allocate(initial, &stencil, split..stencil.nx)?;
        debug!(
            split,
            nx = stencil.nx,
            workers = self.workers,
            "hybrid partition ready"
        );
        self.partition = Some(Partition { stencil, split });
        Ok(ARENA_PAIR.map(|device| HybridArena {
            host: initial.values().to_vec(),
            device,
        }))
    }

    fn step(&mut self, current: &HybridArena, next: &mut HybridArena) -> Result<()> {
        check_pair(current.device, next.device)?;
        let Partition { stencil, split } =
            self.partition.ok_or_else(|| unbound(BackendKind::Hybrid))?;
        let ny = stencil.ny;

        self.device.submit_step(current.device.slot())?;
        apply_stencil_rows(
            &self.pool,
            self.workers,
            &current.host,
            &mut next.host,
            0..split,
            &stencil,
        );

        self.device.upload_rows(
            next.device.slot(),
            split - 1,
            &next.host[(split - 1) * ny..split * ny],
        )?;
        self.device.download_rows(
            next.device.slot(),
            split..split + 1,
            &mut next.host[split * ny..(split + 1) * ny],
        )
    }

    fn synchronize(&mut self) -> Result<()> {
        self.device.wait_idle()
    }

    fn read_back(&mut self, arena: &HybridArena) -> Result<Field> {
        let Partition { stencil, split } =
            self.partition.ok_or_else(|| unbound(BackendKind::Hybrid))?;
        let BoundStencil { nx, ny, .. } = stencil;
        let mut values = arena.host.clone();
        self.device.download_rows(
            arena.device.slot(),
            split..nx,
            &mut values[split * ny..],
        )?;
        Field::new(nx, ny, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heat_core::engine::update_row;
    use heat_core::{SerialEngine, SimulationConfig, SimulationRun, TimeStepper};

    enum Op {
        Step(usize),
        Upload {
            slot: usize,
            first_row: usize,
            values: Vec<Scalar>,
        },
    }

    /// Host stand-in for the device: work is queued and only runs when a
    /// download or wait forces it, like a command queue.
    #[derive(Default)]
    struct QueuedRows {
        stencil: Option<BoundStencil>,
        rows: Range<usize>,
        buffers: [Vec<Scalar>; 2],
        queue: Vec<Op>,
        skip_uploads: bool,
    }

    impl QueuedRows {
        fn flush(&mut self) {
            let Some(BoundStencil {
                nx,
                ny,
                coefficients,
            }) = self.stencil
            else {
                return;
            };
            for op in std::mem::take(&mut self.queue) {
                match op {
                    Op::Step(current) => {
                        let [a, b] = &mut self.buffers;
                        let (input, output) = if current == 0 { (&*a, b) } else { (&*b, a) };
                        for i in self.rows.clone() {
                            let out_row = &mut output[i * ny..(i + 1) * ny];
                            update_row(input, out_row, i, nx, ny, &coefficients);
                        }
                    }
                    Op::Upload {
                        slot,
                        first_row,
                        values,
                    } => {
                        let start = first_row * ny;
                        self.buffers[slot][start..start + values.len()].copy_from_slice(&values);
                    }
                }
            }
        }
    }

    impl RowDevice for QueuedRows {
        fn allocate(
            &mut self,
            initial: &Field,
            stencil: &BoundStencil,
            rows: Range<usize>,
        ) -> Result<()> {
            self.stencil = Some(*stencil);
            self.rows = rows;
            self.buffers = [initial.values().to_vec(), initial.values().to_vec()];
            Ok(())
        }

        fn submit_step(&mut self, current: usize) -> Result<()> {
            self.queue.push(Op::Step(current));
            Ok(())
        }

        fn upload_rows(&mut self, slot: usize, first_row: usize, values: &[Scalar]) -> Result<()> {
            if !self.skip_uploads {
                self.queue.push(Op::Upload {
                    slot,
                    first_row,
                    values: values.to_vec(),
                });
            }
            Ok(())
        }

        fn download_rows(
            &mut self,
            slot: usize,
            rows: Range<usize>,
            out: &mut [Scalar],
        ) -> Result<()> {
            self.flush();
            let ny = self.stencil.map_or(0, |s| s.ny);
            out.copy_from_slice(&self.buffers[slot][rows.start * ny..rows.end * ny]);
            Ok(())
        }

        fn wait_idle(&mut self) -> Result<()> {
            self.flush();
            Ok(())
        }
    }

    fn run_for(kind: BackendKind, nx: usize, ny: usize, nt: u64) -> SimulationRun {
        let cfg = SimulationConfig::default().with_grid(nx, ny, nt);
        SimulationRun::from_config(&cfg, kind).unwrap()
    }

    #[test]
    fn split_keeps_a_row_on_each_side() {
        assert_eq!(split_row(100, 0.5), 50);
        assert_eq!(split_row(100, 0.25), 75);
        assert_eq!(split_row(3, 0.01), 2);
        assert_eq!(split_row(3, 0.99), 1);
    }

    #[test]
    fn halo_exchange_reproduces_serial_field() {
        for steps in [99, 100] {
            let reference = TimeStepper::new(SerialEngine::new())
                .run(&run_for(BackendKind::Serial, 50, 50, steps))
                .unwrap()
                .field;
            for fraction in [0.02, 0.1, 0.5, 0.9, 0.98] {
                let engine = HybridEngine::with_device(QueuedRows::default(), 3, fraction).unwrap();
                let result = TimeStepper::new(engine)
                    .run(&run_for(BackendKind::Hybrid, 50, 50, steps))
                    .unwrap();
                assert_eq!(result.field, reference, "fraction={fraction} steps={steps}");
                assert_eq!(result.metadata.workers, 3);
            }
        }
    }

    #[test]
    fn partition_covers_every_row_once() {
        let mut engine = HybridEngine::with_device(QueuedRows::default(), 2, 0.3).unwrap();
        assert!(engine.partition().is_none());
        let run = run_for(BackendKind::Hybrid, 20, 7, 1);
        engine.allocate(&run.initial_field(), run.params()).unwrap();
        let (host, device) = engine.partition().unwrap();
        assert_eq!(host, 0..14);
        assert_eq!(device, 14..20);
    }

    #[test]
    fn missing_upload_leaves_a_stale_seam() {
        let reference = TimeStepper::new(SerialEngine::new())
            .run(&run_for(BackendKind::Serial, 30, 30, 50))
            .unwrap()
            .field;
        let device = QueuedRows {
            skip_uploads: true,
            ..QueuedRows::default()
        };
        let engine = HybridEngine::with_device(device, 2, 0.5).unwrap();
        let result = TimeStepper::new(engine)
            .run(&run_for(BackendKind::Hybrid, 30, 30, 50))
            .unwrap();
        assert_ne!(result.field, reference);
    }

    #[test]
    fn rejects_degenerate_settings() {
        assert!(HybridEngine::with_device(QueuedRows::default(), 0, 0.5).is_err());
        assert!(HybridEngine::with_device(QueuedRows::default(), 2, 0.0).is_err());
        assert!(HybridEngine::with_device(QueuedRows::default(), 2, 1.0).is_err());
        assert!(HybridEngine::with_device(QueuedRows::default(), 2, f64::NAN).is_err());
    }
}
