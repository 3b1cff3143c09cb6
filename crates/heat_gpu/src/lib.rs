//! wgpu backends for the heat stencil: a whole-grid device engine and a
//! row-partitioned CPU+GPU engine.
//!
//! Both require an adapter with `SHADER_F64` so results agree with the host
//! engines to double precision. Use [`GpuContext::request`] to probe for one.

pub mod context;
mod device_field;
pub mod engine;
pub mod hybrid;
pub mod pipeline;
pub mod rows;

pub use context::GpuContext;
pub use engine::{DeviceArena, GpuEngine};
pub use hybrid::{HybridArena, HybridEngine};
pub use rows::{RowDevice, WgpuRows};
