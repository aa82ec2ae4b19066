//! Watermark compositing
//!
//! The mark is a single line of text repeated over a lattice that is rotated about
//! the image center. The lattice is laid out in an unrotated frame whose origin
//! sits one image width left of and one image height above the image, with a
//! horizontal step of `8 * font_size` and a vertical step of `6 * font_size`.
//! Each output pixel is mapped back into that frame and looks up the nearest
//! tiles, so the lattice is unbounded and the rotated image is always fully
//! covered, whatever its aspect ratio.

use ab_glyph::{FontVec, PxScale};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, Luma, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use photostock_core::constants::{
    WATERMARK_MAX_WORKING_HEIGHT_FACTOR, WATERMARK_TILE_STEP_X_FACTOR, WATERMARK_TILE_STEP_Y_FACTOR,
};
use photostock_core::WatermarkConfig;
use std::sync::OnceLock;

use super::brightness::{average_brightness, MarkColor};
use super::encode::{encode_png, EncodedDerivative};
use crate::error::RenderError;

/// A composited watermark render before encoding
#[derive(Debug, Clone)]
pub struct WatermarkRender {
    pub image: RgbaImage,
    /// Mean luminance of the working image the mark color was chosen from
    pub brightness: f64,
    pub color: MarkColor,
}

/// Composites the tiled text mark onto originals.
///
/// The font is read from `font_path` on first use and cached; a font that cannot
/// be loaded fails the render and is retried on the next call.
pub struct WatermarkCompositor {
    config: WatermarkConfig,
    font: OnceLock<FontVec>,
}

impl WatermarkCompositor {
    pub fn new(config: WatermarkConfig) -> Self {
        Self {
            config,
            font: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    fn font(&self) -> Result<&FontVec, RenderError> {
        if let Some(font) = self.font.get() {
            return Ok(font);
        }

        let path = &self.config.font_path;
        let font_error = |reason: String| RenderError::Font {
            path: path.display().to_string(),
            reason,
        };

        let data = std::fs::read(path).map_err(|e| font_error(e.to_string()))?;
        let font = FontVec::try_from_vec(data).map_err(|e| font_error(e.to_string()))?;

        tracing::debug!(path = %path.display(), "Loaded watermark font");

        Ok(self.font.get_or_init(|| font))
    }

    /// Composite the mark onto `original` and return the fitted render.
    ///
    /// 1. Resize to `max_working_width` (aspect preserved, Lanczos3).
    /// 2. Pick white or black from the sampled brightness.
    /// 3. Blend the rotated text lattice at `opacity`.
    /// 4. Shrink to fit `final_max_box` if larger.
    pub fn compose(&self, original: &DynamicImage) -> Result<WatermarkRender, RenderError> {
        let (width, height) = original.dimensions();
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyImage { width, height });
        }

        let font = self.font()?;
        let stamp = Stamp::render(font, &self.config.text, self.config.font_size)
            .ok_or_else(|| RenderError::NoGlyphs(self.config.text.clone()))?;

        let working = to_working_width(original, self.config.max_working_width);
        let brightness = average_brightness(&working, self.config.sample_stride);
        let color = MarkColor::for_brightness(brightness);

        let mut canvas = working.into_rgba8();
        self.apply_lattice(&mut canvas, &stamp, color);

        let image = fit_within(canvas, self.config.final_max_box);

        tracing::debug!(
            source_width = width,
            source_height = height,
            width = image.width(),
            height = image.height(),
            brightness = brightness,
            color = color.as_str(),
            "Composited watermark"
        );

        Ok(WatermarkRender {
            image,
            brightness,
            color,
        })
    }

    /// Composite and encode as PNG
    pub fn render(&self, original: &DynamicImage) -> Result<EncodedDerivative, RenderError> {
        let render = self.compose(original)?;
        encode_png(&DynamicImage::ImageRgba8(render.image))
    }

    fn apply_lattice(&self, canvas: &mut RgbaImage, stamp: &Stamp, color: MarkColor) {
        let (width, height) = canvas.dimensions();
        let (width, height) = (width as f32, height as f32);

        let step_x = WATERMARK_TILE_STEP_X_FACTOR * self.config.font_size;
        let step_y = WATERMARK_TILE_STEP_Y_FACTOR * self.config.font_size;
        let origin_x = -width;
        let origin_y = -height;
        let center_x = width / 2.0;
        let center_y = height / 2.0;

        // Tiles farther than this many steps from the nearest one cannot reach a pixel.
        let reach_x = (stamp.center_x / step_x + 0.5).ceil() as i32;
        let reach_y = (stamp.center_y / step_y + 0.5).ceil() as i32;

        let (sin, cos) = self.config.angle_degrees.to_radians().sin_cos();
        let rgb = color.rgb();
        let opacity = self.config.opacity.clamp(0.0, 1.0);

        for (px, py, pixel) in canvas.enumerate_pixels_mut() {
            let dx = px as f32 + 0.5 - center_x;
            let dy = py as f32 + 0.5 - center_y;

            // Inverse rotation back into the lattice frame
            let fx = center_x + cos * dx + sin * dy;
            let fy = center_y - sin * dx + cos * dy;

            let nearest_i = ((fx - origin_x) / step_x).round() as i32;
            let nearest_j = ((fy - origin_y) / step_y).round() as i32;

            let mut coverage = 0.0f32;
            for j in (nearest_j - reach_y)..=(nearest_j + reach_y) {
                let tile_y = origin_y + j as f32 * step_y;
                for i in (nearest_i - reach_x)..=(nearest_i + reach_x) {
                    let tile_x = origin_x + i as f32 * step_x;
                    coverage = coverage.max(
                        stamp.sample(fx - tile_x + stamp.center_x, fy - tile_y + stamp.center_y),
                    );
                }
            }

            if coverage <= 0.0 {
                continue;
            }

            let alpha = coverage * opacity;
            for (channel, mark) in pixel.0.iter_mut().take(3).zip(rgb) {
                *channel = (*channel as f32 * (1.0 - alpha) + mark as f32 * alpha).round() as u8;
            }
            let base_alpha = pixel.0[3] as f32 / 255.0;
            pixel.0[3] = ((base_alpha + alpha * (1.0 - base_alpha)) * 255.0).round() as u8;
        }
    }
}

/// Rasterized coverage of one copy of the mark text, centered on `(center_x, center_y)`
struct Stamp {
    coverage: GrayImage,
    center_x: f32,
    center_y: f32,
}

impl Stamp {
    fn render(font: &FontVec, text: &str, font_size: f32) -> Option<Self> {
        let scale = PxScale::from(font_size);
        let (text_width, text_height) = text_size(scale, font, text);
        if text_width == 0 || text_height == 0 {
            return None;
        }

        let pad = (font_size / 2.0).ceil().max(1.0) as u32;
        let mut coverage = GrayImage::new(text_width + 2 * pad, text_height + 2 * pad);
        draw_text_mut(
            &mut coverage,
            Luma([255u8]),
            pad as i32,
            pad as i32,
            scale,
            font,
            text,
        );

        if coverage.pixels().all(|p| p.0[0] == 0) {
            return None;
        }

        Some(Self {
            center_x: coverage.width() as f32 / 2.0,
            center_y: coverage.height() as f32 / 2.0,
            coverage,
        })
    }

    /// Bilinear coverage in `0.0..=1.0` at continuous stamp coordinates
    fn sample(&self, x: f32, y: f32) -> f32 {
        let fx = x - 0.5;
        let fy = y - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.texel(x0, y0) * (1.0 - tx) + self.texel(x0 + 1, y0) * tx;
        let bottom = self.texel(x0, y0 + 1) * (1.0 - tx) + self.texel(x0 + 1, y0 + 1) * tx;
        (top * (1.0 - ty) + bottom * ty) / 255.0
    }

    fn texel(&self, x: i64, y: i64) -> f32 {
        if x < 0 || y < 0 || x >= self.coverage.width() as i64 || y >= self.coverage.height() as i64
        {
            return 0.0;
        }
        self.coverage.get_pixel(x as u32, y as u32).0[0] as f32
    }
}

/// Resize so the width equals `target`, scaling height proportionally.
/// Narrower sources are enlarged. Very tall sources are instead scaled to the
/// height cap and end up narrower than `target`.
fn to_working_width(img: &DynamicImage, target: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let (working_width, working_height) = working_dimensions(width, height, target);
    if (working_width, working_height) == (width, height) {
        return DynamicImage::ImageRgba8(img.to_rgba8());
    }

    img.resize_exact(working_width, working_height, FilterType::Lanczos3)
}

fn working_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    let target = target.max(1);
    let max_height = target.saturating_mul(WATERMARK_MAX_WORKING_HEIGHT_FACTOR);

    let scaled_height = (height as f64 * target as f64 / width as f64).round();
    if scaled_height <= max_height as f64 {
        return (target, (scaled_height as u32).max(1));
    }

    let scaled_width = (width as f64 * max_height as f64 / height as f64).round() as u32;
    (scaled_width.max(1), max_height)
}

/// Shrink to fit a `max_box x max_box` square, never enlarging
fn fit_within(img: RgbaImage, max_box: u32) -> RgbaImage {
    let max_box = max_box.max(1);
    if img.width() <= max_box && img.height() <= max_box {
        return img;
    }
    DynamicImage::ImageRgba8(img)
        .resize(max_box, max_box, FilterType::Lanczos3)
        .into_rgba8()
}
