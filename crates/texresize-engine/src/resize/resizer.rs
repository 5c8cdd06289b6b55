use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::coords::Extent;
use crate::render::RenderCtx;

use super::error::ResizeError;
use super::program::Program;
use super::shader::{generate, Orientation, ShaderSources, ShaderVariant};
use super::stage::{Framebuffer, Stage};
use super::{select_factor, Factor, ResizeConfig};

/// Produces shader text for a variant. [`generate`] unless overridden.
pub type ShaderGenerator = fn(&ShaderVariant) -> ShaderSources;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct TriangleVertex {
    pos: [f32; 2],
}

/// One oversized triangle covering clip space; reused by both passes.
const FULLSCREEN_TRIANGLE: [TriangleVertex; 3] = [
    TriangleVertex { pos: [-1.0, -1.0] },
    TriangleVertex { pos: [3.0, -1.0] },
    TriangleVertex { pos: [-1.0, 3.0] },
];

/// Which factor the stages currently hold resources for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ResizeState {
    /// Nothing allocated yet.
    #[default]
    Idle,
    /// Both stages sized and compiled for this factor.
    Configured(Factor),
}

impl ResizeState {
    /// Configured factor; `Factor::ONE` while idle.
    pub fn factor(self) -> Factor {
        match self {
            ResizeState::Idle => Factor::ONE,
            ResizeState::Configured(f) => f,
        }
    }
}

/// Texture handed back by [`TextureResize::update`].
#[derive(Debug, Copy, Clone)]
pub enum ResizeOutput<'a> {
    /// The caller's source, untouched.
    Passthrough(&'a wgpu::TextureView),
    /// The internally owned downscaled texture.
    Downscaled(&'a wgpu::TextureView),
}

impl<'a> ResizeOutput<'a> {
    pub fn view(self) -> &'a wgpu::TextureView {
        match self {
            ResizeOutput::Passthrough(v) | ResizeOutput::Downscaled(v) => v,
        }
    }

    pub fn is_downscaled(self) -> bool {
        matches!(self, ResizeOutput::Downscaled(_))
    }
}

/// Downscales a fixed-size color texture to just above the active viewport.
///
/// Construct once per source resolution and call [`update`](Self::update) every
/// frame. The source view must expose gamma-encoded values through a filterable
/// float format (e.g. `Rgba8Unorm`, not an sRGB view).
///
/// All GPU work issued by `update` is recorded into its own encoder and
/// submitted before it returns; caller render passes, targets and viewports are
/// never touched.
pub struct TextureResize {
    source: Extent,
    config: ResizeConfig,
    state: ResizeState,
    generation: u64,

    width_stage: Stage,
    height_stage: Stage,

    vertex_buffer: wgpu::Buffer,
    nearest_sampler: wgpu::Sampler,
    linear_sampler: wgpu::Sampler,

    generator: ShaderGenerator,
}

impl TextureResize {
    /// Creates an idle resizer for sources of size `source`.
    ///
    /// Stage textures and programs are allocated on the first `update` that
    /// needs them.
    pub fn new(device: &wgpu::Device, source: Extent, config: ResizeConfig) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("texresize fullscreen triangle"),
            contents: bytemuck::cast_slice(&FULLSCREEN_TRIANGLE),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let nearest_sampler = create_sampler(device, "texresize nearest", wgpu::FilterMode::Nearest);
        let linear_sampler = create_sampler(device, "texresize linear", wgpu::FilterMode::Linear);

        Self {
            source,
            width_stage: Stage::new(Orientation::Horizontal, config.intermediate_format),
            height_stage: Stage::new(Orientation::Vertical, config.output_format),
            config,
            state: ResizeState::Idle,
            generation: 0,
            vertex_buffer,
            nearest_sampler,
            linear_sampler,
            generator: generate,
        }
    }

    /// Replaces the shader generator. Takes effect on the next factor change.
    pub fn with_generator(mut self, generator: ShaderGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Full-resolution source size this resizer was built for.
    pub fn source_extent(&self) -> Extent {
        self.source
    }

    pub fn state(&self) -> ResizeState {
        self.state
    }

    /// Currently configured factor.
    pub fn factor(&self) -> Factor {
        self.state.factor()
    }

    /// Number of times the stages have been reconfigured.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Output size of one stage, once configured.
    pub fn stage_extent(&self, orientation: Orientation) -> Option<Extent> {
        self.stage(orientation).framebuffer().map(|fb| fb.extent)
    }

    /// Final downscaled texture, once configured.
    pub fn output_texture(&self) -> Option<&wgpu::Texture> {
        self.height_stage.framebuffer().map(|fb| &fb.texture)
    }

    pub fn output_extent(&self) -> Option<Extent> {
        self.stage_extent(Orientation::Vertical)
    }

    /// Shrinks `source` for presentation in `ctx.viewport`.
    ///
    /// Returns `source` itself when no reduction is needed or when anything
    /// failed; failures are logged and the configured factor is kept, so the
    /// next call retries rendering without rebuilding.
    pub fn update<'a>(
        &'a mut self,
        ctx: &RenderCtx<'_>,
        source: &'a wgpu::TextureView,
    ) -> ResizeOutput<'a> {
        let factor = select_factor(self.source, ctx.viewport.extent(), self.config.max_factor);
        if factor.is_one() {
            log::trace!("no resize needed for viewport {}", ctx.viewport.extent());
            return ResizeOutput::Passthrough(source);
        }

        let oom_scope = ctx.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let validation_scope = ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);

        self.configure(ctx.device, factor);
        let rendered = self.render(ctx, source);

        let validation_error = pollster::block_on(validation_scope.pop());
        let oom_error = pollster::block_on(oom_scope.pop());

        let outcome = rendered.and_then(|()| match validation_error.or(oom_error) {
            Some(err) => Err(ResizeError::Gpu(err.to_string())),
            None => Ok(()),
        });

        if let Err(err) = outcome {
            log::error!("{err} (using unscaled texture)");
            return ResizeOutput::Passthrough(source);
        }

        match self.height_stage.framebuffer() {
            Some(fb) => ResizeOutput::Downscaled(&fb.view),
            None => ResizeOutput::Passthrough(source),
        }
    }

    fn stage(&self, orientation: Orientation) -> &Stage {
        match orientation {
            Orientation::Horizontal => &self.width_stage,
            Orientation::Vertical => &self.height_stage,
        }
    }

    /// Resizes stage storage and rebuilds both programs when `factor` differs
    /// from the configured one. The only place texture storage is allocated.
    fn configure(&mut self, device: &wgpu::Device, factor: Factor) {
        if self.state == ResizeState::Configured(factor) {
            return;
        }

        let f = factor.get();
        let width_out = Extent::new(self.source.width / f, self.source.height);
        let height_out = self.source.div(f);

        log::debug!(
            "resize factor {} -> {factor}: stages {width_out} and {height_out}",
            self.state.factor()
        );

        let program = self.build_program(device, Orientation::Horizontal, factor, self.source);
        self.width_stage.reconfigure(device, width_out, program);

        let program = self.build_program(device, Orientation::Vertical, factor, width_out);
        self.height_stage.reconfigure(device, height_out, program);

        self.state = ResizeState::Configured(factor);
        self.generation += 1;
    }

    fn build_program(
        &self,
        device: &wgpu::Device,
        orientation: Orientation,
        factor: Factor,
        input: Extent,
    ) -> Result<Program, super::ShaderError> {
        let variant = ShaderVariant {
            orientation,
            factor,
            input,
        };
        let sources = (self.generator)(&variant);
        let stage = self.stage(orientation);
        Program::build(device, stage.label(), &sources, stage.format())
    }

    /// Records and submits both passes.
    fn render(&self, ctx: &RenderCtx<'_>, source: &wgpu::TextureView) -> Result<(), ResizeError> {
        let (width_fb, width_program) = operative(&self.width_stage)?;
        let (height_fb, height_program) = operative(&self.height_stage)?;

        // Nearest filtering on the source: the shader does all the averaging.
        let width_bind_group = self
            .width_stage
            .bind_group(ctx.device, source, &self.nearest_sampler)
            .ok_or(ResizeError::ProgramUnavailable(Orientation::Horizontal))?;
        let height_bind_group = self
            .height_stage
            .bind_group(ctx.device, &width_fb.view, &self.linear_sampler)
            .ok_or(ResizeError::ProgramUnavailable(Orientation::Vertical))?;

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("texresize encoder"),
            });

        self.draw_pass(
            &mut encoder,
            self.width_stage.label(),
            width_fb,
            width_program,
            &width_bind_group,
        );
        self.draw_pass(
            &mut encoder,
            self.height_stage.label(),
            height_fb,
            height_program,
            &height_bind_group,
        );

        ctx.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn draw_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        target: &Framebuffer,
        program: &Program,
        bind_group: &wgpu::BindGroup,
    ) {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_viewport(
            0.0,
            0.0,
            target.extent.width as f32,
            target.extent.height as f32,
            0.0,
            1.0,
        );
        rpass.set_pipeline(&program.pipeline);
        rpass.set_bind_group(program.locations.texture.group, bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        rpass.draw(0..FULLSCREEN_TRIANGLE.len() as u32, 0..1);
    }
}

impl Drop for TextureResize {
    fn drop(&mut self) {
        self.width_stage.release();
        self.height_stage.release();
        self.vertex_buffer.destroy();
        log::debug!("texture resize for {} released", self.source);
    }
}

fn operative(stage: &Stage) -> Result<(&Framebuffer, &Program), ResizeError> {
    match (stage.framebuffer(), stage.program()) {
        (Some(fb), Some(program)) => Ok((fb, program)),
        _ => Err(ResizeError::ProgramUnavailable(stage.orientation())),
    }
}

fn create_sampler(device: &wgpu::Device, label: &str, filter: wgpu::FilterMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}
