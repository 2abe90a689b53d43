use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageFormat, RgbaImage};

use crate::error::{PixelError, Result};
use crate::transform::CropRegion;

/// Suffix appended to every exported file.
pub const SAVE_SUFFIX: &str = "-pxd.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Rgb,
    Rgba,
    Grayscale,
    /// Single channel holding only 0 and 255.
    Binary,
}

impl ColorMode {
    pub fn channels(self) -> usize {
        match self {
            ColorMode::Rgb => 3,
            ColorMode::Rgba => 4,
            ColorMode::Grayscale | ColorMode::Binary => 1,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorMode::Rgb => "RGB",
            ColorMode::Rgba => "RGBA",
            ColorMode::Grayscale => "L",
            ColorMode::Binary => "1",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    image: DynamicImage,
    mode: ColorMode,
}

impl PixelBuffer {
    /// Wrap a decoded image. Layouts other than 8-bit L/RGB/RGBA are
    /// converted to RGBA8.
    pub fn from_image(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(_) => Self { image, mode: ColorMode::Grayscale },
            DynamicImage::ImageRgb8(_) => Self { image, mode: ColorMode::Rgb },
            DynamicImage::ImageRgba8(_) => Self { image, mode: ColorMode::Rgba },
            other => Self {
                image: DynamicImage::ImageRgba8(other.to_rgba8()),
                mode: ColorMode::Rgba,
            },
        }
    }

    pub fn from_rgba(image: RgbaImage) -> Self {
        Self {
            image: DynamicImage::ImageRgba8(image),
            mode: ColorMode::Rgba,
        }
    }

    /// Wrap a thresholded luma image. Callers guarantee every sample is 0 or 255.
    pub fn binary(image: GrayImage) -> Self {
        Self {
            image: DynamicImage::ImageLuma8(image),
            mode: ColorMode::Binary,
        }
    }

    /// Decode `path` into an alpha-preserving RGBA buffer.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|source| PixelError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let buffer = Self::from_rgba(decoded.to_rgba8());
        tracing::info!(
            path = %path.display(),
            width = buffer.width(),
            height = buffer.height(),
            "Loaded image"
        );
        Ok(buffer)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn color_mode(&self) -> ColorMode {
        self.mode
    }

    pub fn channels(&self) -> usize {
        self.mode.channels()
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height() as usize, self.width() as usize, self.channels())
    }

    pub fn to_array(&self) -> &[u8] {
        self.image.as_bytes()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn to_rgba8(&self) -> RgbaImage {
        self.image.to_rgba8()
    }

    pub fn full_region(&self) -> CropRegion {
        CropRegion::full(self.width(), self.height())
    }

    /// Copy out `region` (top-left origin, exclusive max). The region must
    /// already be validated against this buffer.
    pub fn crop(&self, region: &CropRegion) -> Self {
        Self {
            image: self
                .image
                .crop_imm(region.xmin, region.ymin, region.width(), region.height()),
            mode: self.mode,
        }
    }

    pub fn unique_colors(&self) -> usize {
        self.to_array()
            .chunks_exact(self.channels())
            .collect::<HashSet<&[u8]>>()
            .len()
    }

    /// Starting value for a color-count stepper when no count is set yet.
    pub fn color_step_baseline(&self) -> usize {
        self.unique_colors().saturating_sub(1)
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.image.save_with_format(path.as_ref(), ImageFormat::Png)?;
        Ok(())
    }

    /// Write to the first free `{prefix}{filename}{counter}-pxd.png`.
    pub fn save_numbered(&self, prefix: &str, filename: &str, counter: &mut u32) -> Result<PathBuf> {
        let path = next_save_path(prefix, filename, counter);
        self.save_png(&path)?;
        tracing::info!(path = %path.display(), "Saved image");
        Ok(path)
    }
}

/// Advance `counter` past every existing file and return the first free path.
pub fn next_save_path(prefix: &str, filename: &str, counter: &mut u32) -> PathBuf {
    loop {
        let candidate = PathBuf::from(format!("{prefix}{filename}{counter}{SAVE_SUFFIX}"));
        if !candidate.exists() {
            return candidate;
        }
        *counter += 1;
    }
}

/// File stem used to name exports; `"Generic"` when the path has none.
pub fn source_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.split('.').next().unwrap_or(s))
        .filter(|s| !s.is_empty())
        .unwrap_or("Generic")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage, Rgba};

    #[test]
    fn test_shape_matches_array() {
        let img = RgbaImage::from_pixel(7, 3, Rgba([1, 2, 3, 255]));
        let buffer = PixelBuffer::from_rgba(img);
        let (h, w, c) = buffer.shape();
        assert_eq!((h, w, c), (3, 7, 4));
        assert_eq!(buffer.to_array().len(), h * w * c);
    }

    #[test]
    fn test_from_image_modes() {
        let rgb = PixelBuffer::from_image(DynamicImage::ImageRgb8(RgbImage::new(2, 2)));
        assert_eq!(rgb.color_mode(), ColorMode::Rgb);
        let gray = PixelBuffer::from_image(DynamicImage::ImageLuma8(GrayImage::new(2, 2)));
        assert_eq!(gray.color_mode(), ColorMode::Grayscale);
        let wide = PixelBuffer::from_image(DynamicImage::new_rgba16(2, 2));
        assert_eq!(wide.color_mode(), ColorMode::Rgba);
        assert_eq!(wide.to_array().len(), 16);
    }

    #[test]
    fn test_unique_colors() {
        let mut img = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        img.put_pixel(1, 1, Rgb([255, 0, 0]));
        img.put_pixel(2, 2, Rgb([0, 255, 0]));
        let buffer = PixelBuffer::from_image(DynamicImage::ImageRgb8(img));
        assert_eq!(buffer.unique_colors(), 3);
        assert_eq!(buffer.color_step_baseline(), 2);
    }

    #[test]
    fn test_crop_keeps_mode() {
        let mut img = GrayImage::new(10, 10);
        img.put_pixel(4, 5, Luma([255]));
        let buffer = PixelBuffer::binary(img);
        let cropped = buffer.crop(&CropRegion::new(4, 5, 6, 8));
        assert_eq!(cropped.color_mode(), ColorMode::Binary);
        assert_eq!((cropped.width(), cropped.height()), (2, 3));
        assert_eq!(cropped.to_array()[0], 255);
    }

    #[test]
    fn test_source_stem() {
        assert_eq!(source_stem(Path::new("/tmp/cat.png")), "cat");
        assert_eq!(source_stem(Path::new("shots/frog.final.jpg")), "frog");
        assert_eq!(source_stem(Path::new("/")), "Generic");
    }

    #[test]
    fn test_load_missing_file_is_decode_error() {
        match PixelBuffer::load("/definitely/not/here.png") {
            Err(PixelError::Decode { path, .. }) => {
                assert_eq!(path, PathBuf::from("/definitely/not/here.png"))
            }
            other => panic!("Expected Decode error, got {other:?}"),
        }
    }
}
