//! The device half of an engine: two full-size field buffers of which a row
//! window is updated per step.
//!
//! Work is queued in call order. An upload lands after every step queued
//! before it, and a download waits for everything queued before it.

use std::ops::Range;

use heat_core::engine::BoundStencil;
use heat_core::{Field, HeatError, Result, Scalar};

use crate::context::GpuContext;
use crate::device_field::DeviceField;
use crate::pipeline::StencilPipeline;

pub trait RowDevice {
    /// Uploads `initial` into both slots; steps update `rows` only.
    fn allocate(&mut self, initial: &Field, stencil: &BoundStencil, rows: Range<usize>) -> Result<()>;

    /// Queues one step reading slot `current` and writing the other slot.
    fn submit_step(&mut self, current: usize) -> Result<()>;

    /// Queues an overwrite of whole rows of `slot`, starting at `first_row`.
    fn upload_rows(&mut self, slot: usize, first_row: usize, values: &[Scalar]) -> Result<()>;

    /// Copies `rows` of `slot` into `out` once all queued work has finished.
    fn download_rows(&mut self, slot: usize, rows: Range<usize>, out: &mut [Scalar]) -> Result<()>;

    fn wait_idle(&mut self) -> Result<()>;
}

/// [`RowDevice`] backed by wgpu storage buffers and the stencil kernel.
pub struct WgpuRows {
    ctx: GpuContext,
    pipeline: StencilPipeline,
    field: Option<DeviceField>,
}

impl WgpuRows {
    pub fn new(ctx: GpuContext) -> Self {
        let pipeline = StencilPipeline::new(ctx.device());
        Self {
            ctx,
            pipeline,
            field: None,
        }
    }

    /// Shader invocations per step, once allocated.
    pub fn invocations(&self) -> Option<usize> {
        self.field.as_ref().map(DeviceField::invocations)
    }

    fn field(&self) -> Result<&DeviceField> {
        self.field
            .as_ref()
            .ok_or_else(|| HeatError::configuration("device rows used before allocate"))
    }
}

impl RowDevice for WgpuRows {
    fn allocate(&mut self, initial: &Field, stencil: &BoundStencil, rows: Range<usize>) -> Result<()> {
        let field = DeviceField::new(
            &self.ctx,
            &self.pipeline,
            initial,
            &stencil.coefficients,
            rows,
        )?;
        self.field = Some(field);
        Ok(())
    }

    fn submit_step(&mut self, current: usize) -> Result<()> {
        self.field()?.submit_step(&self.ctx, &self.pipeline, current);
        Ok(())
    }

    fn upload_rows(&mut self, slot: usize, first_row: usize, values: &[Scalar]) -> Result<()> {
        self.field()?.write_rows(&self.ctx, slot, first_row, values);
        Ok(())
    }

    fn download_rows(&mut self, slot: usize, rows: Range<usize>, out: &mut [Scalar]) -> Result<()> {
        self.field()?.read_rows(&self.ctx, slot, rows, out)
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.ctx.wait_idle()
    }
}
