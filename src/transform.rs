//! Coordinate bookkeeping between the original image, the current (trimmed)
//! view and the plotted axes.
//!
//! Three spaces are involved:
//! - original space: pixels of the image as loaded, top-left origin;
//! - buffer space: pixels of whatever is currently displayed, top-left origin;
//! - display space: the plotted axes, where y grows upwards from the bottom row.
//!
//! Manual crops are entered in display space, flipped into buffer space,
//! shifted into original space and always applied to the original image.

use std::fmt;

use crate::error::{PixelError, Result};

/// Axis-aligned rectangle, `xmax`/`ymax` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CropRegion {
    pub xmin: u32,
    pub ymin: u32,
    pub xmax: u32,
    pub ymax: u32,
}

impl CropRegion {
    pub fn new(xmin: u32, ymin: u32, xmax: u32, ymax: u32) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Build a region from the `(xmin,xmax)` / `(ymin,ymax)` range fields.
    pub fn from_ranges(x_text: &str, y_text: &str) -> Result<Self> {
        let (xmin, xmax) = parse_range(x_text)?;
        let (ymin, ymax) = parse_range(y_text)?;
        Ok(Self::new(xmin, ymin, xmax, ymax))
    }

    pub fn width(&self) -> u32 {
        self.xmax.saturating_sub(self.xmin)
    }

    pub fn height(&self) -> u32 {
        self.ymax.saturating_sub(self.ymin)
    }

    /// Non-empty and inside a `width x height` buffer.
    pub fn is_valid_for(&self, width: u32, height: u32) -> bool {
        self.xmin < self.xmax && self.xmax <= width && self.ymin < self.ymax && self.ymax <= height
    }

    pub fn validate(&self, width: u32, height: u32) -> Result<()> {
        if self.is_valid_for(width, height) {
            Ok(())
        } else {
            Err(PixelError::InvalidRegion {
                region: *self,
                width,
                height,
            })
        }
    }

    /// Overlap of two regions in the same space, if any.
    pub fn intersect(&self, other: &CropRegion) -> Option<CropRegion> {
        let region = CropRegion::new(
            self.xmin.max(other.xmin),
            self.ymin.max(other.ymin),
            self.xmax.min(other.xmax),
            self.ymax.min(other.ymax),
        );
        (region.xmin < region.xmax && region.ymin < region.ymax).then_some(region)
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})-({},{})", self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

/// Offset of the current view's top-left corner inside the original image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformState {
    pub x_shift: u32,
    pub y_shift: u32,
}

impl TransformState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Shift a buffer-space region into original space.
pub fn to_original_space(region: &CropRegion, state: &TransformState) -> CropRegion {
    CropRegion::new(
        region.xmin + state.x_shift,
        region.ymin + state.y_shift,
        region.xmax + state.x_shift,
        region.ymax + state.y_shift,
    )
}

/// Convert bottom-origin y bounds into top-origin rows of a buffer of
/// `buffer_height` rows. Applying it twice is the identity.
pub fn flip_vertical_for_crop(region: &CropRegion, buffer_height: u32) -> CropRegion {
    CropRegion::new(
        region.xmin,
        buffer_height.saturating_sub(region.ymax),
        region.xmax,
        buffer_height.saturating_sub(region.ymin),
    )
}

/// Record a crop that was applied to the current view. `applied` is in
/// buffer space with a top-left origin.
pub fn update_shift_accumulators(state: &mut TransformState, applied: &CropRegion) {
    state.x_shift += applied.xmin;
    state.y_shift += applied.ymin;
    tracing::debug!(x_shift = state.x_shift, y_shift = state.y_shift, "Updated shift accumulators");
}

/// Parse a `(min,max)` range. Parentheses and surrounding whitespace are
/// optional.
pub fn parse_range(text: &str) -> Result<(u32, u32)> {
    let trimmed = text.trim();
    let inner = trimmed.strip_prefix('(').unwrap_or(trimmed);
    let inner = inner.strip_suffix(')').unwrap_or(inner);

    let (min, max) = inner
        .split_once(',')
        .ok_or_else(|| PixelError::Parse(format!("expected '(min,max)', got '{text}'")))?;

    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|e| PixelError::Parse(format!("invalid bound '{}' in '{text}': {e}", part.trim())))
    };
    Ok((parse(min)?, parse(max)?))
}
