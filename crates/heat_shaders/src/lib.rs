//! WGSL sources for the GPU heat stencil.

pub mod compute {
    pub const STENCIL: &str = include_str!("kernels/stencil.wgsl");
    pub const STENCIL_ENTRY: &str = "stencil_step";
    /// `@workgroup_size` of [`STENCIL_ENTRY`] along x (columns) and y (rows).
    pub const WORKGROUP_SIZE: (u32, u32) = (16, 16);
}
