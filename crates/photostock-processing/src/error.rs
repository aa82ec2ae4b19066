//! Rendering and pipeline errors

use photostock_storage::StorageError;
use std::fmt;
use thiserror::Error;

/// Which derivative an error or artifact belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeKind {
    Thumbnail,
    Watermark,
}

impl fmt::Display for DerivativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivativeKind::Thumbnail => f.write_str("thumbnail"),
            DerivativeKind::Watermark => f.write_str("watermark"),
        }
    }
}

/// Failure of a single render. Always fatal for that render; never retried.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to decode source image: {0}")]
    Decode(String),

    #[error("Source image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("Failed to load watermark font {path}: {reason}")]
    Font { path: String, reason: String },

    #[error("Watermark text {0:?} renders no glyphs")]
    NoGlyphs(String),

    #[error("Failed to encode {format} output: {reason}")]
    Encode {
        format: &'static str,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a whole derivative generation call
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Cannot read original: {0}")]
    Source(#[source] RenderError),

    /// One or both renders failed; nothing was written.
    #[error("Derivative generation failed: {}", describe_failures(.thumbnail, .watermark))]
    Derivatives {
        thumbnail: Option<RenderError>,
        watermark: Option<RenderError>,
    },

    #[error("Failed to store {kind}: {source}")]
    Storage {
        kind: DerivativeKind,
        #[source]
        source: StorageError,
    },

    #[error("Derivative generation cancelled")]
    Cancelled,

    #[error("Derivative worker failed: {0}")]
    Worker(String),
}

impl PipelineError {
    /// The render error for `kind`, if that derivative failed to render
    pub fn render_failure(&self, kind: DerivativeKind) -> Option<&RenderError> {
        match (self, kind) {
            (PipelineError::Derivatives { thumbnail, .. }, DerivativeKind::Thumbnail) => {
                thumbnail.as_ref()
            }
            (PipelineError::Derivatives { watermark, .. }, DerivativeKind::Watermark) => {
                watermark.as_ref()
            }
            _ => None,
        }
    }
}

fn describe_failures(thumbnail: &Option<RenderError>, watermark: &Option<RenderError>) -> String {
    match (thumbnail, watermark) {
        (Some(t), Some(w)) => format!("thumbnail: {}; watermark: {}", t, w),
        (Some(t), None) => format!("thumbnail: {}", t),
        (None, Some(w)) => format!("watermark: {}", w),
        (None, None) => "no failure recorded".to_string(),
    }
}
