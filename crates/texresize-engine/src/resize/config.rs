use super::Factor;

/// Tuning for [`TextureResize`](super::TextureResize).
#[derive(Debug, Clone)]
pub struct ResizeConfig {
    /// Upper bound for the selected factor. Values above 16 are not representable.
    pub max_factor: Factor,

    /// Format of the horizontal pass output.
    ///
    /// Holds linear-light values, so it needs more precision than 8 bits.
    pub intermediate_format: wgpu::TextureFormat,

    /// Format of the final, gamma-encoded output.
    ///
    /// Must not be an sRGB format: the shader encodes gamma itself.
    pub output_format: wgpu::TextureFormat,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            max_factor: Factor::MAX,
            intermediate_format: wgpu::TextureFormat::Rgba16Float,
            output_format: wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}
