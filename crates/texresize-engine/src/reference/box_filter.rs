use thiserror::Error;

use crate::coords::Extent;
use crate::resize::shader::GAMMA;
use crate::resize::Factor;

const CHANNELS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("expected {expected} bytes for the given extent, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Display (gamma-encoded) value to linear light.
#[inline]
pub fn to_linear(v: f32) -> f32 {
    v.powf(GAMMA)
}

/// Linear light to display value.
#[inline]
pub fn to_display(v: f32) -> f32 {
    v.powf(1.0 / GAMMA)
}

/// Downscales tightly packed RGBA8 pixels by `factor` on both axes.
///
/// The result is `extent.div(factor)` in size; trailing texels that do not fill
/// a whole block are dropped, as on the GPU. Alpha is averaged without gamma.
pub fn downscale_rgba8(
    pixels: &[u8],
    extent: Extent,
    factor: Factor,
) -> Result<Vec<u8>, ReferenceError> {
    let expected = extent.width as usize * extent.height as usize * CHANNELS;
    if pixels.len() != expected {
        return Err(ReferenceError::SizeMismatch {
            expected,
            actual: pixels.len(),
        });
    }
    if factor.is_one() {
        return Ok(pixels.to_vec());
    }

    let f = factor.get() as usize;
    let (w, h) = (extent.width as usize, extent.height as usize);
    let out_w = w / f;
    let out_h = h / f;

    // Horizontal: linearize, then average runs of `f` texels per row.
    let mut linear = vec![0.0f32; out_w * h * CHANNELS];
    for y in 0..h {
        for x in 0..out_w {
            let mut sum = [0.0f32; CHANNELS];
            for i in 0..f {
                let px = &pixels[((y * w) + x * f + i) * CHANNELS..][..CHANNELS];
                for c in 0..3 {
                    sum[c] += to_linear(px[c] as f32 / 255.0);
                }
                sum[3] += px[3] as f32 / 255.0;
            }
            let dst = &mut linear[((y * out_w) + x) * CHANNELS..][..CHANNELS];
            for c in 0..CHANNELS {
                dst[c] = sum[c] / f as f32;
            }
        }
    }

    // Vertical: average runs of `f` rows, then re-encode.
    let mut out = vec![0u8; out_w * out_h * CHANNELS];
    for y in 0..out_h {
        for x in 0..out_w {
            let mut sum = [0.0f32; CHANNELS];
            for i in 0..f {
                let px = &linear[((y * f + i) * out_w + x) * CHANNELS..][..CHANNELS];
                for c in 0..CHANNELS {
                    sum[c] += px[c];
                }
            }
            let dst = &mut out[((y * out_w) + x) * CHANNELS..][..CHANNELS];
            for c in 0..CHANNELS {
                let avg = sum[c] / f as f32;
                let v = if c < 3 { to_display(avg) } else { avg };
                dst[c] = quantize(v);
            }
        }
    }

    Ok(out)
}

fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(extent: Extent, rgba: [u8; 4]) -> Vec<u8> {
        rgba.repeat((extent.width * extent.height) as usize)
    }

    #[test]
    fn uniform_color_survives_every_factor() {
        let extent = Extent::new(64, 48);
        for value in [0u8, 1, 17, 64, 128, 200, 254, 255] {
            let pixels = solid(extent, [value, value / 2, 255 - value, 255]);
            for factor in [Factor::TWO, Factor::FOUR, Factor::EIGHT, Factor::SIXTEEN] {
                let out = downscale_rgba8(&pixels, extent, factor).expect("downscale");
                for px in out.chunks_exact(4) {
                    assert!(px[0].abs_diff(value) <= 1, "{value} at {factor}: {px:?}");
                    assert!(px[1].abs_diff(value / 2) <= 1);
                    assert!(px[2].abs_diff(255 - value) <= 1);
                    assert_eq!(px[3], 255);
                }
            }
        }
    }

    #[test]
    fn averaging_happens_in_linear_light() {
        // Black and white side by side: linear mean 0.5 encodes to ~186, not 128.
        let pixels = [0, 0, 0, 255, 255, 255, 255, 255, 0, 0, 0, 255, 255, 255, 255, 255];
        let out = downscale_rgba8(&pixels, Extent::new(2, 2), Factor::TWO).expect("downscale");
        assert_eq!(out.len(), 4);
        let expected = quantize(to_display(0.5));
        assert_eq!(expected, 186);
        assert_eq!(&out[..3], &[expected; 3]);
        assert_eq!(out[3], 255);
    }

    #[test]
    fn alpha_is_averaged_without_gamma() {
        let pixels = [9, 9, 9, 0, 9, 9, 9, 255, 9, 9, 9, 0, 9, 9, 9, 255];
        let out = downscale_rgba8(&pixels, Extent::new(2, 2), Factor::TWO).expect("downscale");
        assert_eq!(out[3], 128);
    }

    #[test]
    fn partial_blocks_are_dropped() {
        let extent = Extent::new(5, 3);
        let out = downscale_rgba8(&solid(extent, [1, 2, 3, 4]), extent, Factor::TWO)
            .expect("downscale");
        assert_eq!(out.len(), 2 * 4);
    }

    #[test]
    fn factor_one_is_identity() {
        let pixels = [10, 20, 30, 40];
        let out = downscale_rgba8(&pixels, Extent::new(1, 1), Factor::ONE).expect("downscale");
        assert_eq!(out, pixels);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = downscale_rgba8(&[0; 7], Extent::new(1, 2), Factor::TWO).err();
        assert_eq!(err, Some(ReferenceError::SizeMismatch { expected: 8, actual: 7 }));
    }

    #[test]
    fn gamma_round_trip() {
        for i in 0..=255u8 {
            let v = i as f32 / 255.0;
            assert!((to_display(to_linear(v)) - v).abs() < 1e-5);
        }
    }
}
