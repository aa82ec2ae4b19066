//! Image processing module
//!
//! - Decoding with EXIF orientation correction (source, orientation)
//! - Brightness sampling (brightness)
//! - Derivative renderers (thumbnail, watermark)
//! - Output encoding (encode)

pub mod brightness;
pub mod encode;
pub mod orientation;
pub mod source;
pub mod thumbnail;
pub mod watermark;

pub use brightness::{average_brightness, MarkColor};
pub use encode::EncodedDerivative;
pub use orientation::ImageOrientation;
pub use source::{decode_original, probe_original, SourceInfo};
pub use thumbnail::ThumbnailGenerator;
pub use watermark::{WatermarkCompositor, WatermarkRender};
