use crate::coords::Extent;

use super::error::ShaderError;
use super::program::Program;
use super::shader::Orientation;

/// Stage output texture plus the view the pass renders into.
pub(crate) struct Framebuffer {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub extent: Extent,
}

impl Framebuffer {
    fn new(device: &wgpu::Device, label: &str, extent: Extent, format: wgpu::TextureFormat) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent.to_wgpu(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            extent,
        }
    }
}

/// One directional reduction pass: output storage and the program that fills it.
///
/// A stage starts empty and is reshaped in place on every factor change.
pub(crate) struct Stage {
    orientation: Orientation,
    format: wgpu::TextureFormat,
    label: &'static str,
    framebuffer: Option<Framebuffer>,
    program: Option<Program>,
}

impl Stage {
    pub fn new(orientation: Orientation, format: wgpu::TextureFormat) -> Self {
        let label = match orientation {
            Orientation::Horizontal => "texresize width stage",
            Orientation::Vertical => "texresize height stage",
        };
        Self {
            orientation,
            format,
            label,
            framebuffer: None,
            program: None,
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn framebuffer(&self) -> Option<&Framebuffer> {
        self.framebuffer.as_ref()
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    /// Reallocates output storage at `output` and installs `program`.
    ///
    /// The previous program is dropped before the new one is installed. A failed
    /// build leaves the stage without a program until the next reconfiguration.
    pub fn reconfigure(
        &mut self,
        device: &wgpu::Device,
        output: Extent,
        program: Result<Program, ShaderError>,
    ) {
        self.release();
        self.framebuffer = Some(Framebuffer::new(device, self.label, output, self.format));
        self.program = program.ok();
    }

    /// Bind group sampling `input` through `sampler` with this stage's program.
    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        input: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> Option<wgpu::BindGroup> {
        let program = self.program.as_ref()?;
        let loc = program.locations;
        Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(self.label),
            layout: &program.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: loc.texture.binding,
                    resource: wgpu::BindingResource::TextureView(input),
                },
                wgpu::BindGroupEntry {
                    binding: loc.sampler.binding,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        }))
    }

    /// Frees GPU storage now rather than when the last reference drops.
    ///
    /// Safe to call on a stage that was never configured, and more than once.
    pub fn release(&mut self) {
        self.program = None;
        if let Some(fb) = self.framebuffer.take() {
            fb.texture.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Gpu;
    use crate::resize::shader::{generate, ShaderVariant};
    use crate::resize::Factor;

    fn build(gpu: &Gpu, stage: &Stage) -> Result<Program, ShaderError> {
        let sources = generate(&ShaderVariant {
            orientation: stage.orientation(),
            factor: Factor::TWO,
            input: Extent::new(64, 64),
        });
        Program::build(gpu.device(), stage.label(), &sources, stage.format())
    }

    #[test]
    fn new_stage_is_unconfigured() {
        let stage = Stage::new(Orientation::Horizontal, wgpu::TextureFormat::Rgba16Float);
        assert!(stage.framebuffer().is_none());
        assert!(stage.program().is_none());
    }

    #[test]
    fn reconfigure_allocates_requested_extent() {
        let gpu = pollster::block_on(Gpu::noop()).expect("noop device");
        let mut stage = Stage::new(Orientation::Vertical, wgpu::TextureFormat::Rgba8Unorm);

        let program = build(&gpu, &stage);
        stage.reconfigure(gpu.device(), Extent::new(32, 32), program);
        assert_eq!(stage.framebuffer().map(|fb| fb.extent), Some(Extent::new(32, 32)));
        assert!(stage.program().is_some());

        let program = build(&gpu, &stage);
        stage.reconfigure(gpu.device(), Extent::new(16, 8), program);
        assert_eq!(stage.framebuffer().map(|fb| fb.extent), Some(Extent::new(16, 8)));
    }

    #[test]
    fn failed_program_leaves_stage_inoperative() {
        let gpu = pollster::block_on(Gpu::noop()).expect("noop device");
        let mut stage = Stage::new(Orientation::Horizontal, wgpu::TextureFormat::Rgba16Float);

        stage.reconfigure(
            gpu.device(),
            Extent::new(8, 8),
            Err(ShaderError::MissingBinding { name: "uTexture" }),
        );
        assert!(stage.framebuffer().is_some());
        assert!(stage.program().is_none());

        let sampler = gpu.device().create_sampler(&wgpu::SamplerDescriptor::default());
        let view = &stage.framebuffer().expect("framebuffer").view;
        assert!(stage.bind_group(gpu.device(), view, &sampler).is_none());
    }

    #[test]
    fn release_is_idempotent() {
        let gpu = pollster::block_on(Gpu::noop()).expect("noop device");
        let mut stage = Stage::new(Orientation::Vertical, wgpu::TextureFormat::Rgba8Unorm);
        stage.release();

        let program = build(&gpu, &stage);
        stage.reconfigure(gpu.device(), Extent::new(4, 4), program);
        stage.release();
        stage.release();
        assert!(stage.framebuffer().is_none());
    }
}
