use thiserror::Error;

use super::Orientation;

/// Shader pipeline stage a diagnostic belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

/// Failure while turning generated source into a usable program.
#[derive(Debug, Clone, Error)]
pub enum ShaderError {
    /// Source did not parse. `log` holds the rendered diagnostic.
    #[error("{stage} shader compile failed: {log}")]
    Compile { stage: ShaderStage, log: String },

    /// Source parsed but failed validation.
    #[error("{stage} shader validation failed: {log}")]
    Validation { stage: ShaderStage, log: String },

    /// A required attribute or resource was not found by name.
    #[error("program has no `{name}` binding")]
    MissingBinding { name: &'static str },

    /// A resource was declared outside bind group 0.
    #[error("`{name}` is bound in group {group}; only group 0 is supported")]
    UnsupportedGroup { name: &'static str, group: u32 },
}

/// Reason a resize attempt fell back to the unscaled source.
#[derive(Debug, Clone, Error)]
pub enum ResizeError {
    /// The stage's program failed to build for the current factor.
    #[error("{} stage has no usable program", .0.axis_label())]
    ProgramUnavailable(Orientation),

    /// wgpu reported an error while configuring or rendering.
    #[error("GPU error while resizing: {0}")]
    Gpu(String),
}
