use std::collections::HashMap;

use image::Rgba;

use crate::buffer::PixelBuffer;
use crate::error::Result;
use crate::transform::{
    flip_vertical_for_crop, to_original_space, update_shift_accumulators, CropRegion,
    TransformState,
};

/// The trim applied to the current view. Only one mode is active at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrimMode {
    Auto { threshold: f32 },
    /// Region in display space, as entered by the user.
    Manual { region: CropRegion },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrimOutcome {
    /// `region` is the crop in the input buffer's space.
    Cropped { buffer: PixelBuffer, region: CropRegion },
    /// Every pixel matched the background; the input is returned as is.
    NothingToTrim(PixelBuffer),
}

impl TrimOutcome {
    pub fn buffer(&self) -> &PixelBuffer {
        match self {
            TrimOutcome::Cropped { buffer, .. } => buffer,
            TrimOutcome::NothingToTrim(buffer) => buffer,
        }
    }

    pub fn into_buffer(self) -> PixelBuffer {
        match self {
            TrimOutcome::Cropped { buffer, .. } => buffer,
            TrimOutcome::NothingToTrim(buffer) => buffer,
        }
    }

    pub fn region(&self) -> Option<CropRegion> {
        match self {
            TrimOutcome::Cropped { region, .. } => Some(*region),
            TrimOutcome::NothingToTrim(_) => None,
        }
    }
}

/// Most frequent RGBA value. Ties go to the lexicographically smallest color.
pub fn background_color(buffer: &PixelBuffer) -> Rgba<u8> {
    let rgba = buffer.to_rgba8();
    let mut counts: HashMap<[u8; 4], usize> = HashMap::new();
    for pixel in rgba.pixels() {
        *counts.entry(pixel.0).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by(|(color_a, count_a), (color_b, count_b)| {
            count_a.cmp(count_b).then(color_b.cmp(color_a))
        })
        .map(|(color, _)| Rgba(color))
        .unwrap_or(Rgba([0, 0, 0, 0]))
}

/// ITU-R 601 luma of the per-channel difference, alpha ignored.
fn difference_luma(pixel: &Rgba<u8>, background: &Rgba<u8>) -> f32 {
    let d = |i: usize| pixel.0[i].abs_diff(background.0[i]) as u32;
    let luma = (d(0) * 299 + d(1) * 587 + d(2) * 114 + 500) / 1000;
    luma as f32
}

/// Crop to the bounding box of every pixel whose difference from the
/// background color exceeds `threshold`.
pub fn auto_trim(buffer: &PixelBuffer, threshold: f32) -> TrimOutcome {
    let background = background_color(buffer);
    let rgba = buffer.to_rgba8();

    let mut bounds: Option<CropRegion> = None;
    for (x, y, pixel) in rgba.enumerate_pixels() {
        if difference_luma(pixel, &background) <= threshold {
            continue;
        }
        let b = bounds.get_or_insert(CropRegion::new(x, y, x + 1, y + 1));
        b.xmin = b.xmin.min(x);
        b.ymin = b.ymin.min(y);
        b.xmax = b.xmax.max(x + 1);
        b.ymax = b.ymax.max(y + 1);
    }

    match bounds {
        Some(region) => {
            tracing::info!(%region, background = ?background.0, "Auto-trimmed image");
            TrimOutcome::Cropped {
                buffer: buffer.crop(&region),
                region,
            }
        }
        None => {
            tracing::warn!(threshold, "Nothing to trim: image is uniformly the background color");
            TrimOutcome::NothingToTrim(buffer.clone())
        }
    }
}

/// Crop `original` to `region`, given in the display space of `current`.
///
/// `current` is the view the user was looking at and `state` its offset in
/// `original`. The crop always reads from `original` so successive trims do
/// not compound.
pub fn manual_trim(
    original: &PixelBuffer,
    current: &PixelBuffer,
    region: &CropRegion,
    state: &TransformState,
) -> Result<(PixelBuffer, TransformState)> {
    region.validate(current.width(), current.height())?;

    let applied = flip_vertical_for_crop(region, current.height());
    let in_original = to_original_space(&applied, state);
    in_original.validate(original.width(), original.height())?;

    let mut next = *state;
    update_shift_accumulators(&mut next, &applied);

    tracing::info!(%region, %in_original, "Manually trimmed image");
    Ok((original.crop(&in_original), next))
}
