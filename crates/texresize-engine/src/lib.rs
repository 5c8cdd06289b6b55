//! Texresize engine crate.
//!
//! GPU downscaling of rendered color textures by a power-of-two factor, plus the
//! headless device, logging and readback pieces needed to drive it.

pub mod coords;
pub mod device;
pub mod logging;
pub mod reference;
pub mod render;
pub mod resize;
