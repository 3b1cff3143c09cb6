//! Whole-grid device engine: one dispatch per step, 16x16 workgroups.

use heat_core::engine::{BoundStencil, StencilEngine};
use heat_core::{BackendKind, Field, HeatError, PhysicalParameters, Result};
use tracing::debug;

use crate::context::GpuContext;
use crate::rows::{RowDevice, WgpuRows};

/// Handle to one of the engine's two device buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceArena {
    slot: usize,
}

impl DeviceArena {
    pub fn slot(&self) -> usize {
        self.slot
    }
}

pub(crate) const ARENA_PAIR: [DeviceArena; 2] = [DeviceArena { slot: 0 }, DeviceArena { slot: 1 }];

pub(crate) fn check_pair(current: DeviceArena, next: DeviceArena) -> Result<()> {
    if current.slot == next.slot {
        return Err(HeatError::configuration(
            "stencil step must read and write different buffers",
        ));
    }
    Ok(())
}

pub(crate) fn unbound(kind: BackendKind) -> HeatError {
    HeatError::configuration(format!("{kind} engine stepped before allocate"))
}

pub struct GpuEngine {
    rows: WgpuRows,
    bound: Option<BoundStencil>,
}

impl GpuEngine {
    pub fn new(ctx: GpuContext) -> Self {
        Self {
            rows: WgpuRows::new(ctx),
            bound: None,
        }
    }
}

impl StencilEngine for GpuEngine {
    type Arena = DeviceArena;

    fn kind(&self) -> BackendKind {
        BackendKind::Gpu
    }

    fn workers(&self) -> usize {
        self.rows.invocations().unwrap_or(1)
    }

    fn allocate(&mut self, initial: &Field, params: &PhysicalParameters) -> Result<[DeviceArena; 2]> {
        let stencil = BoundStencil::new(initial, params)?;
        self.rows.allocate(initial, &stencil, 0..stencil.nx)?;
        debug!(
            nx = stencil.nx,
            ny = stencil.ny,
            invocations = self.workers(),
            "gpu engine buffers ready"
        );
        self.bound = Some(stencil);
        Ok(ARENA_PAIR)
    }

    fn step(&mut self, current: &DeviceArena, next: &mut DeviceArena) -> Result<()> {
        check_pair(*current, *next)?;
        self.rows.submit_step(current.slot)
    }

    fn synchronize(&mut self) -> Result<()> {
        self.rows.wait_idle()
    }

    fn read_back(&mut self, arena: &DeviceArena) -> Result<Field> {
        let BoundStencil { nx, ny, .. } = self.bound.ok_or_else(|| unbound(BackendKind::Gpu))?;
        let mut values = vec![0.0; nx * ny];
        self.rows.download_rows(arena.slot, 0..nx, &mut values)?;
        Field::new(nx, ny, values)
    }
}
