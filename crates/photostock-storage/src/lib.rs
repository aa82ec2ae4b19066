//! Photostock Storage Library
//!
//! Storage abstraction for originals and derivatives, plus the local filesystem
//! backend.
//!
//! # Storage key format
//!
//! Every object is keyed by the asset identifier:
//!
//! - **Original**: `originals/{asset_id}.{ext}`
//! - **Thumbnail**: `derivatives/thumbnails/thumb_{asset_id}.jpg`
//! - **Watermark render**: `derivatives/watermarked/wm_{asset_id}.png`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in
//! the `keys` module.

pub mod keys;
pub mod local;
pub mod traits;

pub use local::LocalStorage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
