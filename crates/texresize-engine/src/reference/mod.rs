//! CPU rendition of the GPU box filter.
//!
//! Mirrors the shader math sample for sample so GPU output can be checked
//! against it: the horizontal pass linearizes before averaging, the vertical
//! pass re-encodes after averaging. The float intermediate is kept at full
//! `f32` precision, so results may differ from a half-float GPU intermediate by
//! one code value.

mod box_filter;

pub use box_filter::{downscale_rgba8, to_display, to_linear, ReferenceError};
pub use crate::resize::shader::GAMMA;
