//! Photostock Processing Library
//!
//! Turns an uploaded original into the two derivatives the catalog serves: a
//! cropped thumbnail and a watermark render carrying a tiled, brightness-adaptive
//! text mark.
//!
//! Rendering is synchronous and CPU-bound; `DerivativePipeline` moves it onto the
//! blocking thread pool and writes the results through a `Storage` backend.

pub mod error;
pub mod image;
pub mod pipeline;

pub use error::{DerivativeKind, PipelineError, RenderError};
pub use self::image::{
    average_brightness, probe_original, EncodedDerivative, MarkColor, SourceInfo,
    ThumbnailGenerator, WatermarkCompositor,
};
pub use pipeline::{
    DerivativePipeline, DerivativeRenderer, DerivativeSet, RenderedDerivatives, StoredDerivative,
};
