pub mod adjust;
pub mod buffer;
pub mod config;
pub mod error;
pub mod grid;
mod pixelizer;
pub mod session;
pub mod transform;
pub mod trim;

pub use adjust::Enhancement;
pub use buffer::{ColorMode, PixelBuffer};
pub use config::Params;
pub use error::PixelError;
pub use grid::{compute_grid, render_grid, GridColor, GridGeometry, GridOverlay, GridSpec, TickConfig};
pub use pixelizer::binary::BinaryPixelizer;
pub use pixelizer::kmeans_pixelizer::KmeansPixelizer;
pub use pixelizer::{
    compute_aspect_fractions, parse_color_count, parse_target_cells, pixelate, quantize,
    quantize_in, resize, ColorType, PixelationSpec, Pixelizer,
};
pub use session::Session;
pub use transform::{CropRegion, TransformState};
pub use trim::{auto_trim, manual_trim, TrimMode, TrimOutcome};

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn end_to_end_in_memory() {
        let img = RgbaImage::from_fn(100, 50, |x, y| {
            if (10..40).contains(&y) && (5..60).contains(&x) {
                Rgba([(x * 4) as u8, 30, (y * 5) as u8, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let mut session = Session::from_buffer(PixelBuffer::from_rgba(img), "demo");
        assert!(session.auto_trim(1.0));
        let out = session.pixelate(&PixelationSpec::new(11, Some(2)), &Enhancement::default());
        assert_eq!(out.width().max(out.height()), 11);
        assert_eq!(out.color_mode(), ColorMode::Binary);

        let grid = compute_grid(out.width(), out.height(), &GridSpec::default()).unwrap();
        assert_eq!(grid.lines.vertical.len() as u32, out.width());
    }
}
