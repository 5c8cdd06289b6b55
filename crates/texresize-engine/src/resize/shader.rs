//! WGSL generation for the two reduction passes.
//!
//! Each variant is assembled from immutable text fragments plus two generated
//! constants: `FACTOR` (samples per output texel) and `kDimension` (texel size
//! of the pass's input texture). Per-sample code is emitted by looping over the
//! sample count, so every output is a plain function of its [`ShaderVariant`].

use std::fmt::Write as _;

use crate::coords::Extent;

use super::Factor;

/// Vertex attribute carrying the full-screen triangle corners.
pub const POSITION_ATTRIBUTE: &str = "aPosition";
/// Sampled input texture.
pub const TEXTURE_UNIFORM: &str = "uTexture";
/// Sampler paired with [`TEXTURE_UNIFORM`].
pub const SAMPLER_UNIFORM: &str = "uSampler";

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Display gamma used for linearizing and re-encoding samples.
pub const GAMMA: f32 = 2.2;

const GAMMA_SOURCE: &str = "const kGamma: f32 = 2.2;\n";

const BINDINGS_SOURCE: &str = "\
@group(0) @binding(0) var uTexture: texture_2d<f32>;
@group(0) @binding(1) var uSampler: sampler;
";

const LINEAR_READ_SOURCE: &str = "\
fn read(uv: vec2<f32>) -> vec4<f32> {
    let r = textureSampleLevel(uTexture, uSampler, uv, 0.0);
    return vec4<f32>(pow(r.rgb, vec3<f32>(kGamma)), r.a);
}
";

const PLAIN_READ_SOURCE: &str = "\
fn read(uv: vec2<f32>) -> vec4<f32> {
    return textureSampleLevel(uTexture, uSampler, uv, 0.0);
}
";

/// Reduction axis of a pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Shrinks width; reads gamma-encoded input, writes linear light.
    Horizontal,
    /// Shrinks height; reads linear light, writes gamma-encoded output.
    Vertical,
}

impl Orientation {
    pub fn axis_label(self) -> &'static str {
        match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        }
    }

    /// WGSL expression for a step of `i` texels along this axis.
    fn step(self, i: u32) -> String {
        match self {
            Orientation::Horizontal => format!("vec2<f32>({i}.0 / kDimension.x, 0.0)"),
            Orientation::Vertical => format!("vec2<f32>(0.0, {i}.0 / kDimension.y)"),
        }
    }

    /// First sample of the output texel's block, from the interpolated `base`.
    ///
    /// Along the active axis `base * blocks` is the output texel coordinate, so
    /// the block starts at `floor(base * blocks) * FACTOR`. The expression stays
    /// linear in `base` and is exact at every fragment center. Input texels past
    /// the last whole block are never read.
    fn first_sample(self) -> &'static str {
        match self {
            Orientation::Horizontal => {
                "vec2<f32>((base.x * floor(kDimension.x / f32(FACTOR)) * f32(FACTOR) \
                 + 0.5 - 0.5 * f32(FACTOR)) / kDimension.x, base.y)"
            }
            Orientation::Vertical => {
                "vec2<f32>(base.x, (base.y * floor(kDimension.y / f32(FACTOR)) * f32(FACTOR) \
                 + 0.5 - 0.5 * f32(FACTOR)) / kDimension.y)"
            }
        }
    }
}

/// Everything that determines the generated text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ShaderVariant {
    pub orientation: Orientation,
    pub factor: Factor,
    /// Texel dimensions of the texture this pass samples.
    pub input: Extent,
}

/// Vertex and fragment source for one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

/// Generates both shader stages for `variant`.
///
/// `variant.factor` must be greater than one.
pub fn generate(variant: &ShaderVariant) -> ShaderSources {
    debug_assert!(!variant.factor.is_one(), "no shader for factor 1");

    let header = factor_source(variant.factor);
    let varyings = varyings_source(variant.factor);

    let mut vertex = String::new();
    vertex.push_str(&header);
    vertex.push_str(&dimension_source(variant.input));
    vertex.push_str(&varyings);
    vertex.push_str(&vertex_main_source(variant.orientation, variant.factor));

    let mut fragment = String::new();
    fragment.push_str(&header);
    fragment.push_str(GAMMA_SOURCE);
    fragment.push_str(&varyings);
    fragment.push_str(BINDINGS_SOURCE);
    fragment.push_str(match variant.orientation {
        Orientation::Horizontal => LINEAR_READ_SOURCE,
        Orientation::Vertical => PLAIN_READ_SOURCE,
    });
    fragment.push_str(&fragment_main_source(variant.orientation, variant.factor));

    ShaderSources { vertex, fragment }
}

fn factor_source(factor: Factor) -> String {
    format!("const FACTOR: u32 = {}u;\n", factor.get())
}

fn dimension_source(input: Extent) -> String {
    format!(
        "const kDimension: vec2<f32> = vec2<f32>({}.0, {}.0);\n",
        input.width, input.height
    )
}

/// Two sample coordinates per location keeps factor 16 at eight locations.
fn varying_count(factor: Factor) -> u32 {
    factor.get() / 2
}

fn varyings_source(factor: Factor) -> String {
    let mut s = String::from("struct Varyings {\n    @builtin(position) clip: vec4<f32>,\n");
    for slot in 0..varying_count(factor) {
        let _ = writeln!(s, "    @location({slot}) taps{slot}: vec4<f32>,");
    }
    s.push_str("};\n");
    s
}

fn vertex_main_source(orientation: Orientation, factor: Factor) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "@vertex");
    let _ = writeln!(
        s,
        "fn {VERTEX_ENTRY}(@location(0) {POSITION_ATTRIBUTE}: vec2<f32>) -> Varyings {{"
    );
    s.push_str("    var out: Varyings;\n");
    let _ = writeln!(s, "    out.clip = vec4<f32>({POSITION_ATTRIBUTE}, 0.0, 1.0);");
    // Texture space is +Y down; clip space is +Y up.
    let _ = writeln!(
        s,
        "    let base = vec2<f32>({POSITION_ATTRIBUTE}.x + 1.0, 1.0 - {POSITION_ATTRIBUTE}.y) * 0.5;"
    );
    let _ = writeln!(s, "    let uv = {};", orientation.first_sample());
    for slot in 0..varying_count(factor) {
        let a = slot * 2;
        let _ = writeln!(
            s,
            "    out.taps{slot} = vec4<f32>(uv + {}, uv + {});",
            orientation.step(a),
            orientation.step(a + 1)
        );
    }
    s.push_str("    return out;\n}\n");
    s
}

fn fragment_main_source(orientation: Orientation, factor: Factor) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "@fragment");
    let _ = writeln!(s, "fn {FRAGMENT_ENTRY}(in: Varyings) -> @location(0) vec4<f32> {{");
    s.push_str("    var sum = vec4<f32>(0.0);\n");
    for slot in 0..varying_count(factor) {
        let _ = writeln!(s, "    sum += read(in.taps{slot}.xy) + read(in.taps{slot}.zw);");
    }
    s.push_str("    sum /= f32(FACTOR);\n");
    if orientation == Orientation::Vertical {
        s.push_str("    sum = vec4<f32>(pow(sum.rgb, vec3<f32>(1.0 / kGamma)), sum.a);\n");
    }
    s.push_str("    return sum;\n}\n");
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(orientation: Orientation, factor: Factor) -> ShaderVariant {
        ShaderVariant {
            orientation,
            factor,
            input: Extent::new(1920, 1080),
        }
    }

    fn all_variants() -> Vec<ShaderVariant> {
        let mut out = Vec::new();
        for orientation in [Orientation::Horizontal, Orientation::Vertical] {
            for factor in [Factor::TWO, Factor::FOUR, Factor::EIGHT, Factor::SIXTEEN] {
                out.push(variant(orientation, factor));
            }
        }
        out
    }

    #[test]
    fn constants_are_emitted() {
        let src = generate(&variant(Orientation::Horizontal, Factor::EIGHT));
        assert!(src.vertex.contains("const FACTOR: u32 = 8u;"));
        assert!(src.fragment.contains("const FACTOR: u32 = 8u;"));
        assert!(src.vertex.contains("const kDimension: vec2<f32> = vec2<f32>(1920.0, 1080.0);"));
        assert!(!src.fragment.contains("kDimension"));
    }

    #[test]
    fn one_tap_per_sample() {
        for v in all_variants() {
            let src = generate(&v);
            let expected = v.factor.get() as usize;
            assert_eq!(src.fragment.matches("read(in.taps").count(), expected, "{v:?}");
            assert_eq!(src.vertex.matches("uv + vec2<f32>(").count(), expected, "{v:?}");
        }
    }

    #[test]
    fn sample_offsets_follow_the_active_axis() {
        let h = generate(&variant(Orientation::Horizontal, Factor::FOUR)).vertex;
        assert!(h.contains("uv + vec2<f32>(3.0 / kDimension.x, 0.0)"));
        assert!(!h.contains("kDimension.y"));

        let v = generate(&variant(Orientation::Vertical, Factor::FOUR)).vertex;
        assert!(v.contains("uv + vec2<f32>(0.0, 3.0 / kDimension.y)"));
        assert!(!v.contains("kDimension.x"));
    }

    #[test]
    fn blocks_are_anchored_to_whole_output_texels() {
        let h = generate(&variant(Orientation::Horizontal, Factor::FOUR)).vertex;
        assert!(h.contains("base.x * floor(kDimension.x / f32(FACTOR)) * f32(FACTOR)"));

        let v = generate(&variant(Orientation::Vertical, Factor::FOUR)).vertex;
        assert!(v.contains("base.y * floor(kDimension.y / f32(FACTOR)) * f32(FACTOR)"));
    }

    #[test]
    fn gamma_is_linearized_before_first_pass_and_restored_after_second() {
        let h = generate(&variant(Orientation::Horizontal, Factor::TWO)).fragment;
        assert!(h.contains("pow(r.rgb, vec3<f32>(kGamma))"));
        assert!(!h.contains("1.0 / kGamma"));

        let v = generate(&variant(Orientation::Vertical, Factor::TWO)).fragment;
        assert!(!v.contains("pow(r.rgb"));
        assert!(v.contains("pow(sum.rgb, vec3<f32>(1.0 / kGamma))"));
    }

    #[test]
    fn fixed_names_are_shared_by_all_variants() {
        for v in all_variants() {
            let src = generate(&v);
            assert!(src.vertex.contains(POSITION_ATTRIBUTE));
            assert!(src.fragment.contains(TEXTURE_UNIFORM));
            assert!(src.fragment.contains(SAMPLER_UNIFORM));
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let v = variant(Orientation::Vertical, Factor::SIXTEEN);
        assert_eq!(generate(&v), generate(&v));
    }

    #[test]
    fn every_variant_compiles() {
        for v in all_variants() {
            let src = generate(&v);
            for (label, text) in [("vertex", &src.vertex), ("fragment", &src.fragment)] {
                let module = naga::front::wgsl::parse_str(text)
                    .unwrap_or_else(|e| panic!("{v:?} {label}: {}", e.emit_to_string(text)));
                naga::valid::Validator::new(
                    naga::valid::ValidationFlags::all(),
                    naga::valid::Capabilities::empty(),
                )
                .validate(&module)
                .unwrap_or_else(|e| panic!("{v:?} {label}: {}", e.emit_to_string(text)));
            }
        }
    }

    #[test]
    fn sixteen_samples_fit_in_eight_locations() {
        let src = generate(&variant(Orientation::Horizontal, Factor::SIXTEEN));
        assert!(src.vertex.contains("@location(7) taps7"));
        assert!(!src.vertex.contains("@location(8)"));
    }
}
