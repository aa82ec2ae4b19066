//! Derivative pipeline
//!
//! Decodes an original once, renders the thumbnail and the watermark from the
//! same decoded image, and persists both or neither.

use photostock_core::DerivativeConfig;
use photostock_storage::{keys, Storage};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{DerivativeKind, PipelineError, RenderError};
use crate::image::{decode_original, EncodedDerivative, ThumbnailGenerator, WatermarkCompositor};

/// A derivative that has been written to storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDerivative {
    pub key: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
    pub content_type: &'static str,
}

/// Both derivatives of one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativeSet {
    pub asset_id: Uuid,
    pub thumbnail: StoredDerivative,
    pub watermark: StoredDerivative,
}

/// Encoded but not yet stored derivatives
#[derive(Debug, Clone)]
pub struct RenderedDerivatives {
    pub thumbnail: EncodedDerivative,
    pub watermark: EncodedDerivative,
}

/// Synchronous, CPU-bound half of the pipeline
pub struct DerivativeRenderer {
    thumbnail: ThumbnailGenerator,
    watermark: WatermarkCompositor,
}

impl DerivativeRenderer {
    pub fn new(config: DerivativeConfig) -> Self {
        Self {
            thumbnail: ThumbnailGenerator::new(config.thumbnail),
            watermark: WatermarkCompositor::new(config.watermark),
        }
    }

    /// Decode `data` and run both renderers on it.
    ///
    /// Both renderers always run so that every failure is reported, not just the
    /// first one.
    pub fn render_all(
        &self,
        data: &[u8],
        cancel: &CancellationToken,
    ) -> Result<RenderedDerivatives, PipelineError> {
        let original = decode_original(data).map_err(PipelineError::Source)?;

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let thumbnail = self.thumbnail.render(&original);

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let watermark = self.watermark.render(&original);

        match (thumbnail, watermark) {
            (Ok(thumbnail), Ok(watermark)) => Ok(RenderedDerivatives {
                thumbnail,
                watermark,
            }),
            (thumbnail, watermark) => Err(PipelineError::Derivatives {
                thumbnail: thumbnail.err(),
                watermark: watermark.err(),
            }),
        }
    }
}

/// Generates and stores the derivatives of uploaded originals
#[derive(Clone)]
pub struct DerivativePipeline {
    renderer: Arc<DerivativeRenderer>,
    storage: Arc<dyn Storage>,
}

impl DerivativePipeline {
    pub fn new(config: DerivativeConfig, storage: Arc<dyn Storage>) -> Self {
        Self {
            renderer: Arc::new(DerivativeRenderer::new(config)),
            storage,
        }
    }

    /// Generate both derivatives for the original at `original_path`
    pub async fn generate(
        &self,
        original_path: &Path,
        asset_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<DerivativeSet, PipelineError> {
        let data = tokio::fs::read(original_path)
            .await
            .map_err(|e| PipelineError::Source(RenderError::Io(e)))?;

        self.generate_from_bytes(data, asset_id, cancel).await
    }

    /// Generate both derivatives from the encoded original.
    ///
    /// Nothing is written unless both renders succeed. If the second write fails
    /// the first is removed again. Cancellation is honoured between stages; a
    /// render already running completes but its output is discarded.
    #[tracing::instrument(skip(self, data, asset_id, cancel), fields(asset_id = %asset_id, size_bytes = data.len()))]
    pub async fn generate_from_bytes(
        &self,
        data: Vec<u8>,
        asset_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<DerivativeSet, PipelineError> {
        let rendered = self.render(data, cancel.clone()).await?;
        self.store_rendered(asset_id, rendered, &cancel).await
    }

    /// Decode the original and render both derivatives on the blocking pool
    /// without writing anything.
    pub async fn render(
        &self,
        data: Vec<u8>,
        cancel: CancellationToken,
    ) -> Result<RenderedDerivatives, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let start = Instant::now();
        let renderer = Arc::clone(&self.renderer);
        let render_cancel = cancel.clone();

        let rendered = tokio::task::spawn_blocking(move || renderer.render_all(&data, &render_cancel))
            .await
            .map_err(|e| PipelineError::Worker(e.to_string()))?;

        match rendered {
            Ok(rendered) => {
                tracing::debug!(
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Derivatives rendered"
                );
                Ok(rendered)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Derivative rendering failed");
                Err(e)
            }
        }
    }

    /// Write previously rendered derivatives under the keys of `asset_id`.
    /// Both are stored or neither.
    pub async fn store_rendered(
        &self,
        asset_id: Uuid,
        rendered: RenderedDerivatives,
        cancel: &CancellationToken,
    ) -> Result<DerivativeSet, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let thumbnail_key = keys::thumbnail_key(asset_id);
        let thumbnail = self
            .store(DerivativeKind::Thumbnail, thumbnail_key, rendered.thumbnail)
            .await?;

        let watermark_key = keys::watermark_key(asset_id);
        let watermark = match self
            .store(DerivativeKind::Watermark, watermark_key, rendered.watermark)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                self.discard(&thumbnail.key).await;
                return Err(e);
            }
        };

        tracing::info!(
            asset_id = %asset_id,
            thumbnail_key = %thumbnail.key,
            watermark_key = %watermark.key,
            watermark_width = watermark.width,
            watermark_height = watermark.height,
            "Derivatives stored"
        );

        Ok(DerivativeSet {
            asset_id,
            thumbnail,
            watermark,
        })
    }

    /// Remove both derivatives of an asset. Missing objects are ignored.
    pub async fn remove(&self, asset_id: Uuid) -> Result<(), PipelineError> {
        for (kind, key) in [
            (DerivativeKind::Thumbnail, keys::thumbnail_key(asset_id)),
            (DerivativeKind::Watermark, keys::watermark_key(asset_id)),
        ] {
            self.storage
                .delete(&key)
                .await
                .map_err(|source| PipelineError::Storage { kind, source })?;
        }
        Ok(())
    }

    async fn store(
        &self,
        kind: DerivativeKind,
        key: String,
        derivative: EncodedDerivative,
    ) -> Result<StoredDerivative, PipelineError> {
        let size_bytes = derivative.size_bytes();
        let url = self
            .storage
            .upload_with_key(&key, derivative.bytes, derivative.content_type)
            .await
            .map_err(|source| PipelineError::Storage { kind, source })?;

        Ok(StoredDerivative {
            key,
            url,
            width: derivative.width,
            height: derivative.height,
            size_bytes,
            content_type: derivative.content_type,
        })
    }

    async fn discard(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            tracing::error!(key = %key, error = %e, "Failed to remove orphaned derivative");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use photostock_core::WatermarkConfig;
    use photostock_storage::LocalStorage;
    use std::io::Cursor;
    use std::path::PathBuf;

    const FONT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../assets/fonts/DejaVuSans.ttf");

    fn config(font_path: &str) -> DerivativeConfig {
        DerivativeConfig {
            watermark: WatermarkConfig {
                font_path: PathBuf::from(font_path),
                ..WatermarkConfig::default()
            },
            ..DerivativeConfig::default()
        }
    }

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 90])
        });
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .unwrap();
        buf
    }

    async fn pipeline(dir: &Path, font_path: &str) -> (DerivativePipeline, Arc<LocalStorage>) {
        let storage = Arc::new(
            LocalStorage::new(dir, "http://localhost/media".to_string())
                .await
                .unwrap(),
        );
        let pipeline = DerivativePipeline::new(config(font_path), storage.clone());
        (pipeline, storage)
    }

    #[tokio::test]
    async fn test_generate_writes_both_derivatives() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, storage) = pipeline(dir.path(), FONT).await;

        let original = dir.path().join("upload.jpg");
        std::fs::write(&original, jpeg(1600, 900)).unwrap();

        let asset_id = Uuid::new_v4();
        let set = pipeline
            .generate(&original, asset_id, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(set.thumbnail.key, keys::thumbnail_key(asset_id));
        assert_eq!(set.watermark.key, keys::watermark_key(asset_id));
        assert_eq!((set.thumbnail.width, set.thumbnail.height), (300, 300));
        assert_eq!((set.watermark.width, set.watermark.height), (720, 405));
        assert!(storage.exists(&set.thumbnail.key).await.unwrap());
        assert!(storage.exists(&set.watermark.key).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_font_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, storage) = pipeline(dir.path(), "/nonexistent/font.ttf").await;

        let asset_id = Uuid::new_v4();
        let err = pipeline
            .generate_from_bytes(jpeg(640, 480), asset_id, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err.render_failure(DerivativeKind::Watermark),
            Some(RenderError::Font { .. })
        ));
        assert!(err.render_failure(DerivativeKind::Thumbnail).is_none());
        assert!(!storage
            .exists(&keys::thumbnail_key(asset_id))
            .await
            .unwrap());
        assert!(!storage
            .exists(&keys::watermark_key(asset_id))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_original_is_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _storage) = pipeline(dir.path(), FONT).await;

        let err = pipeline
            .generate_from_bytes(b"garbage".to_vec(), Uuid::new_v4(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Source(RenderError::Decode(_))));
    }

    #[tokio::test]
    async fn test_missing_original_is_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _storage) = pipeline(dir.path(), FONT).await;

        let err = pipeline
            .generate(
                &dir.path().join("nope.jpg"),
                Uuid::new_v4(),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Source(RenderError::Io(_))));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, storage) = pipeline(dir.path(), FONT).await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let asset_id = Uuid::new_v4();
        let err = pipeline
            .generate_from_bytes(jpeg(320, 240), asset_id, cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
        assert!(!storage
            .exists(&keys::thumbnail_key(asset_id))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_render_writes_nothing_until_stored() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, storage) = pipeline(dir.path(), FONT).await;

        let rendered = pipeline
            .render(jpeg(800, 600), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!((rendered.watermark.width, rendered.watermark.height), (720, 540));

        let asset_id = Uuid::new_v4();
        assert!(!storage
            .exists(&keys::thumbnail_key(asset_id))
            .await
            .unwrap());

        let set = pipeline
            .store_rendered(asset_id, rendered, &CancellationToken::new())
            .await
            .unwrap();
        assert!(storage.exists(&set.thumbnail.key).await.unwrap());
        assert!(storage.exists(&set.watermark.key).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_deletes_both() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, storage) = pipeline(dir.path(), FONT).await;

        let asset_id = Uuid::new_v4();
        pipeline
            .generate_from_bytes(jpeg(400, 400), asset_id, CancellationToken::new())
            .await
            .unwrap();
        pipeline.remove(asset_id).await.unwrap();

        assert!(!storage
            .exists(&keys::thumbnail_key(asset_id))
            .await
            .unwrap());
        assert!(!storage
            .exists(&keys::watermark_key(asset_id))
            .await
            .unwrap());
    }
}
