use image::imageops::FilterType;

use crate::buffer::PixelBuffer;
use crate::error::{PixelError, Result};

pub mod binary;
pub mod kmeans_pixelizer;

use binary::BinaryPixelizer;
use kmeans_pixelizer::KmeansPixelizer;

/// Below this short/long side ratio an image is treated as rectangular.
pub const SQUARE_TOLERANCE: f32 = 0.99;

/// Largest palette the k-means quantizer supports (indices are `u8`).
pub const MAX_PALETTE: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ColorType {
    #[default]
    Lab,
    Rgb,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelationSpec {
    /// Cells along the longer side.
    pub target_cells: u32,
    /// Palette size; `None` keeps the resampled colors.
    pub color_count: Option<usize>,
    /// Space the k-means palette is clustered in.
    pub color_type: ColorType,
}

impl PixelationSpec {
    pub fn new(target_cells: u32, color_count: Option<usize>) -> Self {
        Self {
            target_cells,
            color_count,
            color_type: ColorType::default(),
        }
    }

    pub fn with_color_type(mut self, color_type: ColorType) -> Self {
        self.color_type = color_type;
        self
    }
}

impl Default for PixelationSpec {
    fn default() -> Self {
        Self::new(50, None)
    }
}

pub trait Pixelizer {
    /// Reduce `buffer` to at most `num_colors` distinct colors.
    fn quantize(&self, buffer: &PixelBuffer, num_colors: usize) -> PixelBuffer;
}

/// Per-axis fractions of the target cell count, `(frac_h, frac_w)`.
///
/// The longer side gets 1.0 and the shorter `shorter / longer`, unless the
/// sides are within 1% of each other, in which case both get 1.0.
pub fn compute_aspect_fractions(height: u32, width: u32) -> (f32, f32) {
    if height == 0 || width == 0 {
        return (1.0, 1.0);
    }
    let (h, w) = (height as f32, width as f32);
    if height > width && w / h < SQUARE_TOLERANCE {
        (1.0, w / h)
    } else if width > height && h / w < SQUARE_TOLERANCE {
        (h / w, 1.0)
    } else {
        (1.0, 1.0)
    }
}

/// Output `(width, height)` in cells, never zero.
pub fn cell_dimensions(target_cells: u32, frac_h: f32, frac_w: f32) -> (u32, u32) {
    let cells = |frac: f32| ((target_cells as f32 * frac).round() as u32).max(1);
    (cells(frac_w), cells(frac_h))
}

/// Nearest-neighbour resample so each output pixel is one flat cell.
pub fn resize(buffer: &PixelBuffer, target_cells: u32, frac_h: f32, frac_w: f32) -> PixelBuffer {
    let (w, h) = cell_dimensions(target_cells, frac_h, frac_w);
    tracing::debug!(
        from_w = buffer.width(),
        from_h = buffer.height(),
        to_w = w,
        to_h = h,
        "Resizing to cells"
    );
    let resized = buffer.image().resize_exact(w, h, FilterType::Nearest);
    match buffer.color_mode() {
        crate::buffer::ColorMode::Binary => PixelBuffer::binary(resized.to_luma8()),
        _ => PixelBuffer::from_image(resized),
    }
}

/// `None` leaves the buffer alone, two colors gives a black/white threshold,
/// anything else a k-means palette in Lab.
pub fn quantize(buffer: &PixelBuffer, color_count: Option<usize>) -> PixelBuffer {
    quantize_in(buffer, color_count, ColorType::Lab)
}

pub fn quantize_in(buffer: &PixelBuffer, color_count: Option<usize>, color_type: ColorType) -> PixelBuffer {
    match color_count {
        None => buffer.clone(),
        Some(2) => BinaryPixelizer.quantize(buffer, 2),
        Some(k) => {
            let k = if k > MAX_PALETTE {
                tracing::warn!(requested = k, max = MAX_PALETTE, "Palette too large, clamping");
                MAX_PALETTE
            } else {
                k
            };
            KmeansPixelizer::new(3, 20, color_type).quantize(buffer, k)
        }
    }
}

/// Blank, non-numeric or sub-two counts mean "do not quantize".
pub fn parse_color_count(text: &str) -> Option<usize> {
    text.trim().parse::<usize>().ok().filter(|&k| k >= 2)
}

pub fn parse_target_cells(text: &str) -> Result<u32> {
    match text.trim().parse::<u32>() {
        Ok(0) => Err(PixelError::Parse("pixel count must be positive".to_string())),
        Ok(n) => Ok(n),
        Err(e) => Err(PixelError::Parse(format!("invalid pixel count '{}': {e}", text.trim()))),
    }
}

/// Aspect-preserving downsample followed by optional color reduction.
pub fn pixelate(buffer: &PixelBuffer, spec: &PixelationSpec) -> PixelBuffer {
    let (frac_h, frac_w) = compute_aspect_fractions(buffer.height(), buffer.width());
    let resized = resize(buffer, spec.target_cells, frac_h, frac_w);
    let out = quantize_in(&resized, spec.color_count, spec.color_type);
    tracing::info!(
        width = out.width(),
        height = out.height(),
        colors = ?spec.color_count,
        "Pixelated image"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_rgba(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 90, 255])
        }))
    }

    #[test]
    fn test_aspect_fractions() {
        assert_eq!(compute_aspect_fractions(50, 100), (0.5, 1.0));
        assert_eq!(compute_aspect_fractions(100, 50), (1.0, 0.5));
        assert_eq!(compute_aspect_fractions(64, 64), (1.0, 1.0));
        // within 1%: treated as square
        assert_eq!(compute_aspect_fractions(995, 1000), (1.0, 1.0));
        assert_eq!(compute_aspect_fractions(1000, 995), (1.0, 1.0));
    }

    #[test]
    fn test_aspect_fractions_symmetric() {
        for (h, w) in [(3, 7), (120, 45), (640, 480), (99, 100), (1, 1000)] {
            let (a, b) = compute_aspect_fractions(h, w);
            let (c, d) = compute_aspect_fractions(w, h);
            assert_eq!((a, b), (d, c), "asymmetric for {h}x{w}");
        }
    }

    #[test]
    fn test_size() {
        let out = pixelate(&gradient(100, 50), &PixelationSpec::new(50, None));
        assert_eq!((out.width(), out.height()), (50, 25));
    }

    #[test]
    fn test_longer_side_matches_target() {
        for (w, h, n) in [(300, 200, 40), (37, 91, 13), (64, 64, 8), (500, 7, 20)] {
            let out = pixelate(&gradient(w, h), &PixelationSpec::new(n, None));
            assert_eq!(out.width().max(out.height()), n);
            let expected = n as f32 * w.min(h) as f32 / w.max(h) as f32;
            let short = out.width().min(out.height()) as f32;
            assert!((short - expected).abs() <= 1.0, "{w}x{h} -> {short} vs {expected}");
        }
    }

    #[test]
    fn test_resize_is_nearest() {
        // Two flat halves must stay two flat colors after downsampling.
        let img = RgbaImage::from_fn(40, 40, |x, _| {
            if x < 20 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let out = resize(&PixelBuffer::from_rgba(img), 10, 1.0, 1.0);
        assert_eq!(out.unique_colors(), 2);
    }

    #[test]
    fn test_quantize_none_is_noop() {
        let buffer = gradient(16, 16);
        assert_eq!(quantize(&buffer, None), buffer);
    }

    #[test]
    fn test_quantize_clamps_palette() {
        let buffer = PixelBuffer::from_rgba(RgbaImage::from_fn(32, 32, |x, y| {
            Rgba([(x * 8) as u8, (y * 8) as u8, 90, 255])
        }));
        assert_eq!(buffer.unique_colors(), 1024);

        let out = quantize(&buffer, Some(300));
        assert_eq!((out.width(), out.height()), (32, 32));
        assert!(out.unique_colors() <= MAX_PALETTE);

        let out = quantize_in(&buffer, Some(1000), ColorType::Rgb);
        assert!(out.unique_colors() <= MAX_PALETTE);
    }

    #[test]
    fn test_parse_color_count() {
        assert_eq!(parse_color_count(""), None);
        assert_eq!(parse_color_count("abc"), None);
        assert_eq!(parse_color_count("1"), None);
        assert_eq!(parse_color_count(" 8 "), Some(8));
    }

    #[test]
    fn test_parse_target_cells() {
        assert_eq!(parse_target_cells("50").unwrap(), 50);
        assert!(parse_target_cells("0").is_err());
        assert!(parse_target_cells("fifty").is_err());
    }
}
