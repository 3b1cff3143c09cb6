//! A field mirrored in two device buffers with precreated ping-pong bind groups.

use std::ops::Range;

use heat_core::{Field, HeatError, Result, Scalar, StencilCoefficients};
use wgpu::util::DeviceExt;

use heat_shaders::compute::WORKGROUP_SIZE;

use crate::context::GpuContext;
use crate::pipeline::{StencilParamsGpu, StencilPipeline};

const SCALAR_BYTES: wgpu::BufferAddress = std::mem::size_of::<Scalar>() as wgpu::BufferAddress;

pub(crate) struct DeviceField {
    ny: usize,
    buffers: [wgpu::Buffer; 2],
    /// `bind_groups[k]` reads `buffers[k]` and writes `buffers[1 - k]`.
    bind_groups: [wgpu::BindGroup; 2],
    staging: wgpu::Buffer,
    workgroups: (u32, u32),
}

impl DeviceField {
    /// Uploads `initial` into both buffers; dispatches will update `rows` only.
    pub fn new(
        ctx: &GpuContext,
        pipeline: &StencilPipeline,
        initial: &Field,
        coefficients: &StencilCoefficients,
        rows: Range<usize>,
    ) -> Result<Self> {
        let (nx, ny) = initial.shape();
        if rows.is_empty() || rows.end > nx {
            return Err(HeatError::configuration(format!(
                "device rows {rows:?} outside grid of {nx} rows"
            )));
        }
        let dim = |v: usize, what: &str| {
            u32::try_from(v).map_err(|_| {
                HeatError::configuration(format!("{what} {v} exceeds the device index range"))
            })
        };
        let params = StencilParamsGpu {
            dims: [
                dim(nx, "nx")?,
                dim(ny, "ny")?,
                dim(rows.start, "row")?,
                dim(rows.end, "row")?,
            ],
            coefficients: [coefficients.alpha_dt, coefficients.dx2, coefficients.dy2, 0.0],
        };
        let (wg_x, wg_y) = WORKGROUP_SIZE;
        let workgroups = (
            dim(ny, "ny")?.div_ceil(wg_x),
            dim(rows.len(), "rows")?.div_ceil(wg_y),
        );

        let device = ctx.device();
        let params_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("StencilParams"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let field_buffer = |label| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(initial.values()),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            })
        };
        let buffers = [field_buffer("FieldA"), field_buffer("FieldB")];
        let bind_groups = [
            pipeline.bind_group(device, &params_buf, &buffers[0], &buffers[1]),
            pipeline.bind_group(device, &params_buf, &buffers[1], &buffers[0]),
        ];
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("FieldStaging"),
            size: initial.values().len() as wgpu::BufferAddress * SCALAR_BYTES,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            ny,
            buffers,
            bind_groups,
            staging,
            workgroups,
        })
    }

    /// Shader invocations launched per step.
    pub fn invocations(&self) -> usize {
        let (wg_x, wg_y) = WORKGROUP_SIZE;
        (self.workgroups.0 * wg_x) as usize * (self.workgroups.1 * wg_y) as usize
    }

    /// Submits one step reading slot `current` and writing the other slot.
    pub fn submit_step(&self, ctx: &GpuContext, pipeline: &StencilPipeline, current: usize) {
        let mut encoder = ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("heat_step"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("StencilPass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline.pipeline());
            pass.set_bind_group(0, &self.bind_groups[current], &[]);
            pass.dispatch_workgroups(self.workgroups.0, self.workgroups.1, 1);
        }
        ctx.queue().submit(Some(encoder.finish()));
    }

    /// Reads rows `rows` of slot `slot` into `out`.
    pub fn read_rows(
        &self,
        ctx: &GpuContext,
        slot: usize,
        rows: Range<usize>,
        out: &mut [Scalar],
    ) -> Result<()> {
        debug_assert_eq!(out.len(), rows.len() * self.ny);
        let offset = (rows.start * self.ny) as wgpu::BufferAddress * SCALAR_BYTES;
        ctx.download(&self.buffers[slot], &self.staging, offset, out)
    }

    /// Overwrites rows starting at `first_row` of slot `slot` with `values`.
    pub fn write_rows(&self, ctx: &GpuContext, slot: usize, first_row: usize, values: &[Scalar]) {
        let offset = (first_row * self.ny) as wgpu::BufferAddress * SCALAR_BYTES;
        ctx.queue()
            .write_buffer(&self.buffers[slot], offset, bytemuck::cast_slice(values));
    }
}
