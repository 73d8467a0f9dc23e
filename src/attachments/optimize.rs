//! Bounded image re-encoding.

use crate::error::{Result, StoreError};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

/// Limits applied when re-encoding uploaded images.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            max_width: 2000,
            max_height: 2000,
            quality: 85,
        }
    }
}

/// Decode `content`, shrink it to fit within the configured bounds
/// (aspect ratio kept, never enlarged) and re-compress it as JPEG.
///
/// The output is always JPEG regardless of the input format; alpha is
/// dropped.
pub fn optimize(content: &[u8], options: &ImageOptions) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(content)
        .map_err(|e| StoreError::Validation(format!("unreadable image: {e}")))?;

    let fitted = if decoded.width() > options.max_width || decoded.height() > options.max_height {
        decoded.resize(options.max_width, options.max_height, FilterType::Lanczos3)
    } else {
        decoded
    };

    let rgb = DynamicImage::ImageRgb8(fitted.to_rgb8());
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, options.quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| StoreError::Image(e.to_string()))?;
    Ok(out)
}
