//! Output encoding for derivatives

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

use crate::error::RenderError;

/// An encoded derivative ready to be written to storage
#[derive(Debug, Clone)]
pub struct EncodedDerivative {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub content_type: &'static str,
}

impl EncodedDerivative {
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Encode as baseline JPEG. Alpha is dropped.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<EncodedDerivative, RenderError> {
    let (width, height) = img.dimensions();
    let rgb = img.to_rgb8();

    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    encoder
        .encode_image(&rgb)
        .map_err(|e| RenderError::Encode {
            format: "jpeg",
            reason: e.to_string(),
        })?;

    Ok(EncodedDerivative {
        bytes,
        width,
        height,
        content_type: "image/jpeg",
    })
}

/// Encode as PNG, keeping the alpha channel
pub fn encode_png(img: &DynamicImage) -> Result<EncodedDerivative, RenderError> {
    let (width, height) = img.dimensions();

    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| RenderError::Encode {
            format: "png",
            reason: e.to_string(),
        })?;

    Ok(EncodedDerivative {
        bytes,
        width,
        height,
        content_type: "image/png",
    })
}
