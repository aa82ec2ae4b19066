//! Thumbnail generation

use image::imageops::FilterType;
use image::DynamicImage;
use photostock_core::ThumbnailConfig;

use super::encode::{encode_jpeg, EncodedDerivative};
use crate::error::RenderError;

/// Produces square, center-cropped JPEG previews
#[derive(Debug, Clone)]
pub struct ThumbnailGenerator {
    config: ThumbnailConfig,
}

impl ThumbnailGenerator {
    pub fn new(config: ThumbnailConfig) -> Self {
        Self { config }
    }

    /// Scale `original` to cover the `size x size` box with Lanczos3, then crop
    /// the overflow around the center. The aspect ratio is never distorted.
    pub fn render(&self, original: &DynamicImage) -> Result<EncodedDerivative, RenderError> {
        let size = self.config.size.max(1);
        let thumb = original.resize_to_fill(size, size, FilterType::Lanczos3);

        tracing::debug!(
            source_width = original.width(),
            source_height = original.height(),
            width = thumb.width(),
            height = thumb.height(),
            "Rendered thumbnail"
        );

        encode_jpeg(&thumb, self.config.jpeg_quality)
    }
}
