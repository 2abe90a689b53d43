use image::{Rgba, RgbaImage};

use super::{ColorType, Pixelizer};
use crate::buffer::PixelBuffer;
use kmeans_colors::{get_kmeans, Calculate, Kmeans};
use palette::{FromColor, IntoColor, Lab, Srgb};

const SEED: u64 = 42;

pub struct KmeansPixelizer {
    num_runs: u32,
    max_iter: usize,
    color_type: ColorType,
}

impl KmeansPixelizer {
    pub fn new(num_runs: u32, max_iter: usize, color_type: ColorType) -> Self {
        Self {
            num_runs: num_runs.max(1),
            max_iter,
            color_type,
        }
    }
}

impl Default for KmeansPixelizer {
    fn default() -> Self {
        Self::new(3, 20, ColorType::Lab)
    }
}

fn to_srgb(pixel: &Rgba<u8>) -> Srgb {
    Srgb::new(
        pixel[0] as f32 / 255.0,
        pixel[1] as f32 / 255.0,
        pixel[2] as f32 / 255.0,
    )
}

/// Best of `num_runs` k-means runs, each with its own seed.
fn best_kmeans<C: Calculate + Clone>(
    colors: &[C],
    num_colors: usize,
    num_runs: u32,
    max_iter: usize,
    converge: f32,
) -> Kmeans<C> {
    let mut result = Kmeans::<C>::new();
    for run in 0..num_runs {
        let run_result = get_kmeans(
            num_colors,
            max_iter,
            converge,
            false,
            colors,
            SEED + run as u64,
        );
        if run_result.score < result.score {
            result = run_result;
        }
    }
    result
}

fn kmeans_lab(rgba: &RgbaImage, num_colors: usize, num_runs: u32, max_iter: usize) -> (Vec<Srgb<u8>>, Vec<u8>) {
    let lab_vec = rgba
        .pixels()
        .map(|pixel| {
            let lab: Lab = to_srgb(pixel).into_linear().into_color();
            lab
        })
        .collect::<Vec<Lab>>();
    let result = best_kmeans(&lab_vec, num_colors, num_runs, max_iter, 5.0);
    let palette = result
        .centroids
        .iter()
        .map(|c| Srgb::from_color(*c).into_format())
        .collect();
    (palette, result.indices)
}

fn kmeans_rgb(rgba: &RgbaImage, num_colors: usize, num_runs: u32, max_iter: usize) -> (Vec<Srgb<u8>>, Vec<u8>) {
    let rgb_vec = rgba.pixels().map(to_srgb).collect::<Vec<Srgb>>();
    let result = best_kmeans(&rgb_vec, num_colors, num_runs, max_iter, 0.0025);
    let palette = result.centroids.iter().map(|&c| c.into_format()).collect();
    (palette, result.indices)
}

impl Pixelizer for KmeansPixelizer {
    fn quantize(&self, buffer: &PixelBuffer, num_colors: usize) -> PixelBuffer {
        let rgba = buffer.to_rgba8();
        if num_colors == 0 || buffer.unique_colors() <= num_colors {
            return PixelBuffer::from_rgba(rgba);
        }

        let (palette, indices) = match self.color_type {
            ColorType::Lab => kmeans_lab(&rgba, num_colors, self.num_runs, self.max_iter),
            ColorType::Rgb => kmeans_rgb(&rgba, num_colors, self.num_runs, self.max_iter),
        };
        tracing::debug!(palette = palette.len(), "Computed k-means palette");

        let mut out = rgba;
        for (pixel, index) in out.pixels_mut().zip(indices) {
            if let Some(color) = palette.get(index as usize) {
                *pixel = Rgba([color.red, color.green, color.blue, pixel[3]]);
            }
        }
        PixelBuffer::from_rgba(out)
    }
}
