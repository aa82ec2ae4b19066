//! Decoding of uploaded originals

use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;

use super::orientation::ImageOrientation;
use crate::error::RenderError;

/// Format and upright dimensions of an encoded original
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

impl SourceInfo {
    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Canonical file extension for the format, without the dot
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("bin")
    }
}

/// Identify an original from its header without decoding the pixels.
/// Dimensions account for EXIF rotations that swap width and height.
pub fn probe_original(data: &[u8]) -> Result<SourceInfo, RenderError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| RenderError::Decode(e.to_string()))?;

    let format = reader
        .format()
        .ok_or_else(|| RenderError::Decode("Unrecognized image format".to_string()))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| RenderError::Decode(e.to_string()))?;

    let (width, height) = match ImageOrientation::read_exif_orientation(data) {
        5..=8 => (height, width),
        _ => (width, height),
    };

    Ok(SourceInfo {
        width,
        height,
        format,
    })
}

/// Decode an original and bring it upright according to its EXIF orientation.
///
/// The format is sniffed from the bytes; the file extension is never trusted.
pub fn decode_original(data: &[u8]) -> Result<DynamicImage, RenderError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| RenderError::Decode(e.to_string()))?;

    let img = reader
        .decode()
        .map_err(|e| RenderError::Decode(e.to_string()))?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(RenderError::EmptyImage { width, height });
    }

    Ok(ImageOrientation::apply_exif_orientation(img, data))
}
