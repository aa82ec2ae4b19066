//! Brightness sampling
//!
//! Estimates the mean brightness of an image from a sparse grid so the
//! watermark can pick a contrasting mark color without reading every pixel.

use image::{DynamicImage, GenericImageView};
use photostock_core::constants::BRIGHTNESS_DARK_THRESHOLD;

/// Mean of `(r + g + b) / 3`, scaled to `0.0..=1.0`, over the pixels at
/// `(x, y)` where both are multiples of `stride`.
///
/// An image with no sampled pixels reports `1.0` (bright), which selects a black
/// mark. A zero stride is treated as `1`.
pub fn average_brightness(img: &DynamicImage, stride: u32) -> f64 {
    let (width, height) = img.dimensions();
    let stride = stride.max(1) as usize;

    let mut total = 0.0;
    let mut samples = 0u64;

    for y in (0..height).step_by(stride) {
        for x in (0..width).step_by(stride) {
            let pixel = img.get_pixel(x, y).0;
            total += (f64::from(pixel[0]) + f64::from(pixel[1]) + f64::from(pixel[2])) / 3.0;
            samples += 1;
        }
    }

    if samples == 0 {
        return 1.0;
    }

    (total / samples as f64 / 255.0).clamp(0.0, 1.0)
}

/// Color of the watermark text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkColor {
    White,
    Black,
}

impl MarkColor {
    /// White on dark images, black otherwise. Exactly `0.5` counts as bright.
    pub fn for_brightness(brightness: f64) -> Self {
        if brightness < BRIGHTNESS_DARK_THRESHOLD {
            MarkColor::White
        } else {
            MarkColor::Black
        }
    }

    pub fn rgb(&self) -> [u8; 3] {
        match self {
            MarkColor::White => [255, 255, 255],
            MarkColor::Black => [0, 0, 0],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkColor::White => "white",
            MarkColor::Black => "black",
        }
    }
}
