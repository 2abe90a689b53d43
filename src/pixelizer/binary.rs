use image::{GrayImage, Luma};

use super::Pixelizer;
use crate::buffer::PixelBuffer;

pub struct BinaryPixelizer;

/// Threshold maximising between-class variance of the luma histogram.
/// Samples `<= t` form the dark class.
pub fn otsu_threshold(img: &GrayImage) -> u8 {
    let mut hist = [0u32; 256];
    for pixel in img.pixels() {
        hist[pixel.0[0] as usize] += 1;
    }
    let total = img.width() as u64 * img.height() as u64;
    let sum_total: u64 = hist
        .iter()
        .enumerate()
        .map(|(i, &count)| i as u64 * count as u64)
        .sum();

    let mut sum_b = 0u64;
    let mut w_b = 0u64;
    let mut max_var = 0f64;
    let mut threshold = 128u8;

    for (i, &count) in hist.iter().enumerate() {
        w_b += count as u64;
        if w_b == 0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f == 0 {
            break;
        }
        sum_b += i as u64 * count as u64;
        let m_b = sum_b as f64 / w_b as f64;
        let m_f = (sum_total - sum_b) as f64 / w_f as f64;
        let var_between = w_b as f64 * w_f as f64 * (m_b - m_f).powi(2);
        if var_between > max_var {
            max_var = var_between;
            threshold = i as u8;
        }
    }
    threshold
}

impl Pixelizer for BinaryPixelizer {
    fn quantize(&self, buffer: &PixelBuffer, _num_colors: usize) -> PixelBuffer {
        let mut gray = buffer.image().to_luma8();
        let threshold = otsu_threshold(&gray);
        tracing::debug!(threshold, "Otsu threshold");
        for pixel in gray.pixels_mut() {
            *pixel = if pixel.0[0] > threshold { Luma([255]) } else { Luma([0]) };
        }
        PixelBuffer::binary(gray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ColorMode;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_otsu_bimodal() {
        let img = GrayImage::from_fn(20, 10, |x, _| if x < 10 { Luma([40]) } else { Luma([200]) });
        let t = otsu_threshold(&img);
        assert!((40..200).contains(&t), "threshold {t} does not split the modes");
    }

    #[test]
    fn test_two_levels() {
        let img = RgbaImage::from_fn(16, 16, |x, y| Rgba([(x * 16) as u8, (y * 16) as u8, 128, 255]));
        let out = BinaryPixelizer.quantize(&PixelBuffer::from_rgba(img), 2);
        assert_eq!(out.color_mode(), ColorMode::Binary);
        assert_eq!(out.unique_colors(), 2);
        assert!(out.to_array().iter().all(|&v| v == 0 || v == 255));
    }
}
