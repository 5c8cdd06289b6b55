//! Power-of-two texture downscaling.
//!
//! [`TextureResize`] shrinks a rendered color texture so it is no smaller than
//! the presentation viewport, using two separable box-filter passes:
//!
//! 1. horizontal: `factor` texels per row are linearized (`v^2.2`) and averaged
//!    into a float intermediate of `width / factor` × `height`
//! 2. vertical: `factor` intermediate texels per column are averaged and
//!    re-encoded (`v^(1/2.2)`) into the final `width / factor` × `height / factor`
//!
//! GPU resources are rebuilt only when the selected factor changes.

mod config;
mod error;
mod factor;
mod program;
mod resizer;
pub mod shader;
mod stage;

pub use config::ResizeConfig;
pub use error::{ResizeError, ShaderError, ShaderStage};
pub use factor::{select_factor, Factor};
pub use program::{compile, Binding, CompiledShader, Locations, Program};
pub use resizer::{ResizeOutput, ResizeState, ShaderGenerator, TextureResize};
pub use shader::{generate, Orientation, ShaderSources, ShaderVariant};
