use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use texresize_engine::coords::{Extent, Viewport};
use texresize_engine::device::{read_texture_rgba8, Gpu, GpuInit};
use texresize_engine::logging::{init_logging, LoggingConfig};
use texresize_engine::reference::downscale_rgba8;
use texresize_engine::render::RenderCtx;
use texresize_engine::resize::{Factor, ResizeConfig, TextureResize};

/// Shrinks an image on the GPU to the smallest power-of-two reduction that
/// still covers a target viewport.
#[derive(Debug, Parser)]
#[command(name = "texresize", version)]
struct Cli {
    /// Image to shrink.
    input: PathBuf,

    /// Where to write the result.
    output: PathBuf,

    /// Target viewport as WIDTHxHEIGHT, e.g. 960x540.
    #[arg(long, value_parser = parse_extent)]
    viewport: Extent,

    /// Largest factor to consider (1, 2, 4, 8 or 16).
    #[arg(long, default_value_t = 16, value_parser = parse_factor)]
    max_factor: u32,

    /// Compare the GPU result with the CPU reference filter.
    #[arg(long)]
    verify: bool,

    /// Log filter in env_logger syntax; falls back to RUST_LOG.
    #[arg(long)]
    log: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(LoggingConfig {
        env_filter: cli.log.clone(),
        ..LoggingConfig::default()
    });

    pollster::block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let image = image::open(&cli.input)
        .with_context(|| format!("failed to open {}", cli.input.display()))?
        .to_rgba8();
    let extent = Extent::new(image.width(), image.height());
    log::info!("loaded {} ({extent})", cli.input.display());

    let gpu = Gpu::headless(GpuInit::default()).await?;
    let device = gpu.device();
    let queue = gpu.queue();

    let source = upload(device, queue, extent, image.as_raw());
    let source_view = source.create_view(&wgpu::TextureViewDescriptor::default());

    let config = ResizeConfig {
        max_factor: Factor::try_from(cli.max_factor)
            .map_err(|v| anyhow::anyhow!("invalid factor {v}"))?,
        ..ResizeConfig::default()
    };
    let mut resizer = TextureResize::new(device, extent, config);

    let ctx = RenderCtx::new(device, queue, Viewport::from_extent(cli.viewport));
    let downscaled = resizer.update(&ctx, &source_view).is_downscaled();
    let factor = applied_factor(downscaled, resizer.factor());

    let (texture, out_extent) = match (downscaled, resizer.output_texture(), resizer.output_extent()) {
        (true, Some(texture), Some(out_extent)) => (texture, out_extent),
        _ => {
            log::info!("no reduction applied for viewport {}", cli.viewport);
            (&source, extent)
        }
    };

    let pixels = read_texture_rgba8(device, queue, texture, out_extent)?;

    if cli.verify {
        verify(image.as_raw(), extent, factor, &pixels)?;
    }

    image::save_buffer(
        &cli.output,
        &pixels,
        out_extent.width,
        out_extent.height,
        image::ExtendedColorType::Rgba8,
    )
    .with_context(|| format!("failed to write {}", cli.output.display()))?;

    log::info!(
        "wrote {} ({} -> {out_extent}, factor {factor})",
        cli.output.display(),
        resizer.source_extent()
    );
    Ok(())
}

fn upload(device: &wgpu::Device, queue: &wgpu::Queue, extent: Extent, rgba: &[u8]) -> wgpu::Texture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("texresize source"),
        size: wgpu::Extent3d {
            width: extent.width,
            height: extent.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(extent.width * 4),
            rows_per_image: Some(extent.height),
        },
        wgpu::Extent3d {
            width: extent.width,
            height: extent.height,
            depth_or_array_layers: 1,
        },
    );

    texture
}

/// Factor the written image was actually reduced by.
fn applied_factor(downscaled: bool, configured: Factor) -> Factor {
    if downscaled { configured } else { Factor::ONE }
}

fn verify(source: &[u8], extent: Extent, factor: Factor, gpu_pixels: &[u8]) -> Result<()> {
    let expected = downscale_rgba8(source, extent, factor)?;
    anyhow::ensure!(
        expected.len() == gpu_pixels.len(),
        "reference produced {} bytes, GPU {}",
        expected.len(),
        gpu_pixels.len()
    );

    let max_delta = expected
        .iter()
        .zip(gpu_pixels)
        .map(|(a, b)| a.abs_diff(*b))
        .max()
        .unwrap_or(0);

    if max_delta > 2 {
        log::warn!("GPU result deviates from reference by up to {max_delta} code values");
    } else {
        log::info!("GPU result matches reference (max delta {max_delta})");
    }
    Ok(())
}

fn parse_extent(s: &str) -> Result<Extent, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{s}`"))?;
    let width = w.trim().parse::<u32>().map_err(|e| format!("bad width `{w}`: {e}"))?;
    let height = h.trim().parse::<u32>().map_err(|e| format!("bad height `{h}`: {e}"))?;
    if width == 0 || height == 0 {
        return Err(format!("viewport must be non-empty, got `{s}`"));
    }
    Ok(Extent::new(width, height))
}

fn parse_factor(s: &str) -> Result<u32, String> {
    let v = s.parse::<u32>().map_err(|e| e.to_string())?;
    Factor::try_from(v)
        .map(Factor::get)
        .map_err(|v| format!("factor must be 1, 2, 4, 8 or 16, got {v}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_viewport() {
        assert_eq!(parse_extent("960x540"), Ok(Extent::new(960, 540)));
        assert_eq!(parse_extent("1080X1920"), Ok(Extent::new(1080, 1920)));
        assert!(parse_extent("960").is_err());
        assert!(parse_extent("0x540").is_err());
        assert!(parse_extent("axb").is_err());
    }

    #[test]
    fn passthrough_reports_factor_one() {
        assert_eq!(applied_factor(true, Factor::FOUR), Factor::FOUR);
        // A failed or skipped reduction keeps its configured factor.
        assert_eq!(applied_factor(false, Factor::FOUR), Factor::ONE);
    }

    #[test]
    fn parses_factor() {
        assert_eq!(parse_factor("8"), Ok(8));
        assert!(parse_factor("3").is_err());
        assert!(parse_factor("32").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
