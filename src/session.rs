//! One open image and everything derived from it.
//!
//! `Session` is the single owner of the original buffer, the current trimmed
//! view and the shift accumulators. Opening another file builds a new session,
//! which resets all of them.

use std::path::{Path, PathBuf};

use crate::adjust::{enhance, Enhancement};
use crate::buffer::{source_stem, PixelBuffer};
use crate::error::Result;
use crate::pixelizer::{pixelate, PixelationSpec};
use crate::transform::{to_original_space, update_shift_accumulators, CropRegion, TransformState};
use crate::trim::{self, TrimMode};

#[derive(Debug, Clone)]
pub struct Session {
    filename: String,
    original: PixelBuffer,
    current: PixelBuffer,
    state: TransformState,
    mode: Option<TrimMode>,
    save_counter: u32,
}

impl Session {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let buffer = PixelBuffer::load(path)?;
        Ok(Self::from_buffer(buffer, source_stem(path)))
    }

    pub fn from_buffer(buffer: PixelBuffer, filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            current: buffer.clone(),
            original: buffer,
            state: TransformState::default(),
            mode: None,
            save_counter: 0,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn original(&self) -> &PixelBuffer {
        &self.original
    }

    /// The trimmed view, before enhancement or pixelation.
    pub fn current(&self) -> &PixelBuffer {
        &self.current
    }

    pub fn state(&self) -> &TransformState {
        &self.state
    }

    pub fn trim_mode(&self) -> Option<&TrimMode> {
        self.mode.as_ref()
    }

    /// Auto-trim the current view. Returns `false` when there was nothing to
    /// trim; the view is then left as it was.
    ///
    /// The crop offset is added to the shift accumulators so a later manual
    /// trim still lands on the right pixels of the original.
    pub fn auto_trim(&mut self, threshold: f32) -> bool {
        self.mode = Some(TrimMode::Auto { threshold });
        let outcome = trim::auto_trim(&self.current, threshold);
        let Some(region) = outcome.region() else {
            return false;
        };
        tracing::debug!(in_original = %to_original_space(&region, &self.state), "Auto-trim region");
        update_shift_accumulators(&mut self.state, &region);
        self.current = outcome.into_buffer();
        true
    }

    /// Manually trim to `region`, given in the current view's display space.
    /// An invalid region falls back to the full view. Returns the region that
    /// was applied.
    pub fn manual_trim(&mut self, region: CropRegion) -> CropRegion {
        let (applied, result) =
            match trim::manual_trim(&self.original, &self.current, &region, &self.state) {
                Ok(result) => (region, result),
                Err(e) => {
                    tracing::warn!(%e, "Falling back to the full image bounds");
                    let full = self.current.full_region();
                    let result = (self.current.clone(), self.state);
                    (full, result)
                }
            };
        self.mode = Some(TrimMode::Manual { region: applied });
        (self.current, self.state) = result;
        applied
    }

    /// Manual trim from the `(min,max)` range fields; unparsable text falls
    /// back to the full view.
    pub fn manual_trim_text(&mut self, x_range: &str, y_range: &str) -> CropRegion {
        match CropRegion::from_ranges(x_range, y_range) {
            Ok(region) => self.manual_trim(region),
            Err(e) => {
                tracing::warn!(%e, "Error reading coordinate ranges, using full image bounds");
                self.manual_trim(self.current.full_region())
            }
        }
    }

    /// Enhance and pixelate the current view. The view itself is kept, so
    /// pixelating again with other parameters starts from the same pixels.
    pub fn pixelate(&self, spec: &PixelationSpec, enhancement: &Enhancement) -> PixelBuffer {
        let enhanced = enhance(&self.current, enhancement);
        pixelate(&enhanced, spec)
    }

    /// Save as `{prefix}{filename}{counter}-pxd.png`, never overwriting.
    pub fn save(&mut self, buffer: &PixelBuffer, prefix: &str) -> Result<PathBuf> {
        buffer.save_numbered(prefix, &self.filename, &mut self.save_counter)
    }
}
