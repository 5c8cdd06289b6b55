use super::error::{ShaderError, ShaderStage};
use super::shader::{
    ShaderSources, FRAGMENT_ENTRY, POSITION_ATTRIBUTE, SAMPLER_UNIFORM, TEXTURE_UNIFORM,
    VERTEX_ENTRY,
};

/// A shader stage that parsed and validated.
pub struct CompiledShader {
    pub module: naga::Module,
}

/// Compiles one WGSL stage, capturing diagnostics as text.
pub fn compile(stage: ShaderStage, source: &str) -> Result<CompiledShader, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
        stage,
        log: e.emit_to_string(source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::empty(),
    )
    .validate(&module)
    .map_err(|e| ShaderError::Validation {
        stage,
        log: e.emit_to_string(source),
    })?;

    Ok(CompiledShader { module })
}

/// Bind group slot of a named resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Binding {
    pub group: u32,
    pub binding: u32,
}

/// Attribute and resource slots resolved by name from compiled shaders.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Locations {
    pub position: u32,
    pub texture: Binding,
    pub sampler: Binding,
}

impl Locations {
    /// Looks up the fixed names every generated variant shares.
    pub fn resolve(vertex: &CompiledShader, fragment: &CompiledShader) -> Result<Self, ShaderError> {
        let position = attribute_location(&vertex.module, VERTEX_ENTRY, POSITION_ATTRIBUTE)
            .ok_or(ShaderError::MissingBinding {
                name: POSITION_ATTRIBUTE,
            })?;
        let texture = resource_binding(&fragment.module, TEXTURE_UNIFORM)?;
        let sampler = resource_binding(&fragment.module, SAMPLER_UNIFORM)?;

        Ok(Self {
            position,
            texture,
            sampler,
        })
    }
}

fn attribute_location(module: &naga::Module, entry: &str, name: &str) -> Option<u32> {
    let ep = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga::ShaderStage::Vertex && ep.name == entry)?;

    ep.function.arguments.iter().find_map(|arg| {
        match (&arg.name, &arg.binding) {
            (Some(n), Some(naga::Binding::Location { location, .. })) if n == name => Some(*location),
            _ => None,
        }
    })
}

fn resource_binding(module: &naga::Module, name: &'static str) -> Result<Binding, ShaderError> {
    let rb = module
        .global_variables
        .iter()
        .find_map(|(_, var)| {
            if var.name.as_deref() == Some(name) {
                var.binding.clone()
            } else {
                None
            }
        })
        .ok_or(ShaderError::MissingBinding { name })?;

    if rb.group != 0 {
        return Err(ShaderError::UnsupportedGroup {
            name,
            group: rb.group,
        });
    }

    Ok(Binding {
        group: rb.group,
        binding: rb.binding,
    })
}

/// A linked vertex/fragment pair for one reduction stage.
///
/// Dropping a program releases its pipeline and shader modules.
pub struct Program {
    pub(crate) pipeline: wgpu::RenderPipeline,
    pub(crate) bind_group_layout: wgpu::BindGroupLayout,
    pub(crate) locations: Locations,
}

impl Program {
    /// Compiles both stages, resolves locations and creates the pipeline.
    ///
    /// Compile diagnostics are logged here; the returned error carries them too.
    pub fn build(
        device: &wgpu::Device,
        label: &str,
        sources: &ShaderSources,
        target_format: wgpu::TextureFormat,
    ) -> Result<Self, ShaderError> {
        let vertex = compile(ShaderStage::Vertex, &sources.vertex).inspect_err(log_shader_error)?;
        let fragment =
            compile(ShaderStage::Fragment, &sources.fragment).inspect_err(log_shader_error)?;

        let locations = Locations::resolve(&vertex, &fragment)?;

        let vs_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(format!("{label} vs").as_str()),
            source: wgpu::ShaderSource::Wgsl(sources.vertex.as_str().into()),
        });
        let fs_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(format!("{label} fs").as_str()),
            source: wgpu::ShaderSource::Wgsl(sources.fragment.as_str().into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(format!("{label} bgl").as_str()),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: locations.texture.binding,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: locations.sampler.binding,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(format!("{label} pipeline layout").as_str()),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let attributes = [wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 0,
            shader_location: locations.position,
        }];

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(format!("{label} pipeline").as_str()),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vs_module,
                entry_point: Some(VERTEX_ENTRY),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &fs_module,
                entry_point: Some(FRAGMENT_ENTRY),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Ok(Self {
            pipeline,
            bind_group_layout,
            locations,
        })
    }

    pub fn locations(&self) -> Locations {
        self.locations
    }
}

fn log_shader_error(err: &ShaderError) {
    log::error!("{err}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Extent;
    use crate::resize::shader::{generate, Orientation, ShaderVariant};
    use crate::resize::Factor;

    fn sources(orientation: Orientation) -> ShaderSources {
        generate(&ShaderVariant {
            orientation,
            factor: Factor::FOUR,
            input: Extent::new(640, 480),
        })
    }

    #[test]
    fn compile_reports_parse_diagnostics() {
        let err = compile(ShaderStage::Fragment, "fn broken( {").err().expect("must fail");
        match err {
            ShaderError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn compile_reports_validation_diagnostics() {
        // Parses, but returns the wrong type.
        let src = "fn f() -> f32 { return vec2<f32>(0.0); }";
        let err = compile(ShaderStage::Vertex, src).err().expect("must fail");
        assert!(matches!(err, ShaderError::Compile { .. } | ShaderError::Validation { .. }));
    }

    #[test]
    fn locations_resolve_by_name() {
        let src = sources(Orientation::Horizontal);
        let vs = compile(ShaderStage::Vertex, &src.vertex).expect("vertex");
        let fs = compile(ShaderStage::Fragment, &src.fragment).expect("fragment");
        let loc = Locations::resolve(&vs, &fs).expect("locations");

        assert_eq!(loc.position, 0);
        assert_eq!(loc.texture, Binding { group: 0, binding: 0 });
        assert_eq!(loc.sampler, Binding { group: 0, binding: 1 });
    }

    #[test]
    fn missing_texture_is_a_link_failure() {
        let src = sources(Orientation::Vertical);
        let vs = compile(ShaderStage::Vertex, &src.vertex).expect("vertex");
        let fs_src = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        let fs = compile(ShaderStage::Fragment, fs_src).expect("fragment");

        let err = Locations::resolve(&vs, &fs).err().expect("must fail");
        assert!(matches!(err, ShaderError::MissingBinding { name } if name == TEXTURE_UNIFORM));
    }

    #[test]
    fn program_builds_on_device() {
        let gpu = pollster::block_on(crate::device::Gpu::noop()).expect("noop device");
        let program = Program::build(
            gpu.device(),
            "test",
            &sources(Orientation::Vertical),
            wgpu::TextureFormat::Rgba8Unorm,
        )
        .expect("program");
        assert_eq!(program.locations().position, 0);
    }
}
