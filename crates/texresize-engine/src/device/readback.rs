use anyhow::{anyhow, Context, Result};

use crate::coords::Extent;

const BYTES_PER_TEXEL: u32 = 4;

/// Copies a 4-byte-per-texel 2D texture (e.g. `Rgba8Unorm`) into CPU memory.
///
/// Returns tightly packed rows (`extent.width * 4` bytes each). The texture must
/// have been created with `COPY_SRC`. Blocks until the GPU finishes.
pub fn read_texture_rgba8(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    extent: Extent,
) -> Result<Vec<u8>> {
    anyhow::ensure!(!extent.is_empty(), "cannot read back an empty texture ({extent})");

    let unpadded_row = extent.width * BYTES_PER_TEXEL;
    let padded_row = padded_bytes_per_row(extent.width);

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("texresize readback buffer"),
        size: padded_row as u64 * extent.height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("texresize readback encoder"),
    });

    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(extent.height),
            },
        },
        extent.to_wgpu(),
    );

    queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| anyhow!("device poll failed during readback: {e}"))?;
    rx.recv()
        .context("readback map callback was dropped")?
        .map_err(|e| anyhow!("readback buffer map failed: {e}"))?;

    let mapped = slice.get_mapped_range();
    let mut pixels = Vec::with_capacity((unpadded_row * extent.height) as usize);
    for row in mapped.chunks_exact(padded_row as usize) {
        pixels.extend_from_slice(&row[..unpadded_row as usize]);
    }
    drop(mapped);
    buffer.unmap();

    Ok(pixels)
}

fn padded_bytes_per_row(width: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    (width * BYTES_PER_TEXEL).div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(1), 256);
    }

    #[test]
    fn empty_extent_is_rejected() {
        let gpu = pollster::block_on(crate::device::Gpu::noop()).expect("noop device");
        let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: None,
            size: Extent::new(1, 1).to_wgpu(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let result = read_texture_rgba8(gpu.device(), gpu.queue(), &texture, Extent::new(0, 4));
        assert!(result.is_err());
    }
}
