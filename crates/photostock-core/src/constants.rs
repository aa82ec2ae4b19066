//! Defaults for derivative generation.

/// Text tiled across every watermark render
pub const WATERMARK_TEXT: &str = "Photostock";
pub const WATERMARK_FONT_PATH: &str = "./assets/fonts/DejaVuSans.ttf";
pub const WATERMARK_FONT_SIZE: f32 = 48.0;
pub const WATERMARK_OPACITY: f32 = 0.5;
/// Rotation of the tiling frame about the image center, in degrees
pub const WATERMARK_ANGLE_DEGREES: f32 = -45.0;
pub const WATERMARK_MAX_WORKING_WIDTH: u32 = 1200;
/// Working height is capped at this multiple of the working width
pub const WATERMARK_MAX_WORKING_HEIGHT_FACTOR: u32 = 4;
pub const WATERMARK_FINAL_MAX_BOX: u32 = 720;

/// Horizontal tile step as a multiple of the font size
pub const WATERMARK_TILE_STEP_X_FACTOR: f32 = 8.0;
/// Vertical tile step as a multiple of the font size
pub const WATERMARK_TILE_STEP_Y_FACTOR: f32 = 6.0;

/// Pixels skipped between brightness samples
pub const BRIGHTNESS_SAMPLE_STRIDE: u32 = 20;
/// Brightness below which the mark is drawn in white; exactly this value is bright
pub const BRIGHTNESS_DARK_THRESHOLD: f64 = 0.5;

pub const THUMBNAIL_SIZE: u32 = 300;
pub const THUMBNAIL_JPEG_QUALITY: u8 = 85;
