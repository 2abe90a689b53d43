use std::path::PathBuf;

use thiserror::Error;

use crate::transform::CropRegion;

#[derive(Debug, Error)]
pub enum PixelError {
    #[error("Failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid crop region {region} for a {width}x{height} image")]
    InvalidRegion {
        region: CropRegion,
        width: u32,
        height: u32,
    },

    #[error("Invalid grid parameters: {0}")]
    InvalidGrid(String),

    #[error("PNG encode error: {0}")]
    Encode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PixelError>;
