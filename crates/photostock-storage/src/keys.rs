//! Deterministic storage keys derived from an asset identifier.
//!
//! Re-generating derivatives for the same asset writes to the same keys and
//! overwrites the previous objects.

use uuid::Uuid;

pub const THUMBNAIL_PREFIX: &str = "derivatives/thumbnails";
pub const WATERMARK_PREFIX: &str = "derivatives/watermarked";
pub const ORIGINAL_PREFIX: &str = "originals";

/// Key of the retained, unmodified original. `extension` is taken without the dot.
pub fn original_key(asset_id: Uuid, extension: &str) -> String {
    let ext = sanitize_extension(extension);
    if ext.is_empty() {
        format!("{}/{}", ORIGINAL_PREFIX, asset_id)
    } else {
        format!("{}/{}.{}", ORIGINAL_PREFIX, asset_id, ext)
    }
}

pub fn thumbnail_key(asset_id: Uuid) -> String {
    format!("{}/thumb_{}.jpg", THUMBNAIL_PREFIX, asset_id)
}

pub fn watermark_key(asset_id: Uuid) -> String {
    format!("{}/wm_{}.png", WATERMARK_PREFIX, asset_id)
}

fn sanitize_extension(extension: &str) -> String {
    extension
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_lowercase()
}
