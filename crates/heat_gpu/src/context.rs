//! Adapter and device acquisition for the double-precision stencil.

use std::sync::mpsc;

use heat_core::{HeatError, Result};
use tracing::{info, warn};

/// Device and queue of an adapter that supports `SHADER_F64`.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuContext {
    /// Requests a high-performance adapter with `SHADER_F64`.
    ///
    /// Returns `Ok(None)` when no adapter exists or none supports double precision.
    pub async fn request_async() -> Result<Option<Self>> {
        let instance = wgpu::Instance::default();
        let adapter = match instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
        {
            Ok(adapter) => adapter,
            Err(err) => {
                warn!("no GPU adapter available: {err}");
                return Ok(None);
            }
        };

        let adapter_info = adapter.get_info();
        if !adapter.features().contains(wgpu::Features::SHADER_F64) {
            warn!(
                "adapter {} ({:?}) lacks SHADER_F64; double-precision stencil unavailable",
                adapter_info.name, adapter_info.backend
            );
            return Ok(None);
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("heat_device"),
                required_features: wgpu::Features::SHADER_F64,
                required_limits: adapter.limits(),
                ..Default::default()
            })
            .await
            .map_err(|e| HeatError::gpu(format!("failed to request wgpu device: {e}")))?;

        info!(
            "using GPU adapter {} ({:?})",
            adapter_info.name, adapter_info.backend
        );
        Ok(Some(Self { device, queue }))
    }

    pub fn request() -> Result<Option<Self>> {
        pollster::block_on(Self::request_async())
    }

    /// Like [`GpuContext::request`] but treats a missing adapter as an error.
    pub fn new() -> Result<Self> {
        Self::request()?
            .ok_or_else(|| HeatError::gpu("no GPU adapter with SHADER_F64 support found"))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Blocks until every submitted command buffer has finished.
    pub fn wait_idle(&self) -> Result<()> {
        self.device
            .poll(wgpu::PollType::Wait)
            .map(|_| ())
            .map_err(|e| HeatError::gpu(format!("device poll failed: {e}")))
    }

    /// Copies `bytes` bytes of `source` starting at `offset` back to the host.
    pub(crate) fn download(
        &self,
        source: &wgpu::Buffer,
        staging: &wgpu::Buffer,
        offset: wgpu::BufferAddress,
        out: &mut [f64],
    ) -> Result<()> {
        let bytes = std::mem::size_of_val(out) as wgpu::BufferAddress;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("heat_download"),
            });
        encoder.copy_buffer_to_buffer(source, offset, staging, 0, bytes);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..bytes);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.wait_idle()?;
        rx.recv()
            .map_err(|_| HeatError::gpu("buffer mapping callback dropped"))?
            .map_err(|e| HeatError::gpu(format!("failed to map staging buffer: {e}")))?;

        {
            let data = slice.get_mapped_range();
            for (dst, chunk) in out.iter_mut().zip(data.chunks_exact(8)) {
                *dst = bytemuck::pod_read_unaligned(chunk);
            }
        }
        staging.unmap();
        Ok(())
    }
}
