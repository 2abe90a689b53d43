//! Sharpness and contrast enhancement applied before pixelation.
//!
//! Both operations blend the source with a "degenerate" version of itself:
//! `out = degenerate + factor * (src - degenerate)`. A factor of 1.0 returns
//! the source.

use image::{imageops, DynamicImage, Rgba, RgbaImage};

use crate::buffer::{ColorMode, PixelBuffer};

/// Enhancement factors are limited to the range the sliders offer.
pub const MIN_FACTOR: f32 = 1.0;
pub const MAX_FACTOR: f32 = 10.0;

const SMOOTH_KERNEL: [f32; 9] = [1.0, 1.0, 1.0, 1.0, 5.0, 1.0, 1.0, 1.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Enhancement {
    pub sharpness: f32,
    pub contrast: f32,
}

impl Enhancement {
    pub fn new(sharpness: f32, contrast: f32) -> Self {
        Self {
            sharpness: clamp_factor(sharpness),
            contrast: clamp_factor(contrast),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.sharpness == 1.0 && self.contrast == 1.0
    }
}

impl Default for Enhancement {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

fn clamp_factor(factor: f32) -> f32 {
    if factor.is_nan() {
        return 1.0;
    }
    let clamped = factor.clamp(MIN_FACTOR, MAX_FACTOR);
    if clamped != factor {
        tracing::warn!(factor, clamped, "Enhancement factor out of range");
    }
    clamped
}

fn blend(degenerate: u8, src: u8, factor: f32) -> u8 {
    let value = degenerate as f32 + factor * (src as f32 - degenerate as f32);
    value.round().clamp(0.0, 255.0) as u8
}

/// Re-wrap an RGBA result in the caller's channel layout.
fn with_mode(mode: ColorMode, rgba: RgbaImage) -> PixelBuffer {
    match mode {
        ColorMode::Rgba => PixelBuffer::from_rgba(rgba),
        ColorMode::Rgb => PixelBuffer::from_image(DynamicImage::ImageRgb8(
            DynamicImage::ImageRgba8(rgba).to_rgb8(),
        )),
        ColorMode::Grayscale | ColorMode::Binary => PixelBuffer::from_image(
            DynamicImage::ImageLuma8(DynamicImage::ImageRgba8(rgba).to_luma8()),
        ),
    }
}

/// Blend against a 3x3 smoothed copy. Border pixels are left as they are.
pub fn sharpen(buffer: &PixelBuffer, factor: f32) -> PixelBuffer {
    let src = buffer.to_rgba8();
    let (w, h) = src.dimensions();
    if w < 3 || h < 3 {
        return buffer.clone();
    }
    let smooth = imageops::filter3x3(&src, &SMOOTH_KERNEL);

    let out = RgbaImage::from_fn(w, h, |x, y| {
        let s = src.get_pixel(x, y);
        if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
            return *s;
        }
        let m = smooth.get_pixel(x, y);
        Rgba([
            blend(m[0], s[0], factor),
            blend(m[1], s[1], factor),
            blend(m[2], s[2], factor),
            s[3],
        ])
    });
    with_mode(buffer.color_mode(), out)
}

/// Blend against a flat image of the mean luma.
pub fn contrast(buffer: &PixelBuffer, factor: f32) -> PixelBuffer {
    let gray = buffer.image().to_luma8();
    let count = (gray.width() as u64 * gray.height() as u64).max(1);
    let total: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    let mean = (total as f64 / count as f64 + 0.5) as u8;

    let mut out = buffer.to_rgba8();
    for pixel in out.pixels_mut() {
        for c in 0..3 {
            pixel[c] = blend(mean, pixel[c], factor);
        }
    }
    with_mode(buffer.color_mode(), out)
}

/// Sharpen, then adjust contrast; factors of exactly 1.0 are skipped.
pub fn enhance(buffer: &PixelBuffer, enhancement: &Enhancement) -> PixelBuffer {
    let mut out = buffer.clone();
    if enhancement.sharpness != 1.0 {
        out = sharpen(&out, enhancement.sharpness);
    }
    if enhancement.contrast != 1.0 {
        out = contrast(&out, enhancement.contrast);
    }
    if !enhancement.is_identity() {
        tracing::debug!(
            sharpness = enhancement.sharpness,
            contrast = enhancement.contrast,
            "Enhanced image"
        );
    }
    out
}

/// Luma-only preview of `buffer`.
pub fn grayscale(buffer: &PixelBuffer) -> PixelBuffer {
    PixelBuffer::from_image(DynamicImage::ImageLuma8(buffer.image().to_luma8()))
}
