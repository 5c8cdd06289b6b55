//! Headless GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue without a surface
//! - reading texture contents back to the CPU

mod gpu;
mod init;
mod readback;

pub use gpu::Gpu;
pub use init::GpuInit;
pub use readback::read_texture_rgba8;
