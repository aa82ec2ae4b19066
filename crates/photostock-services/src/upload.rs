//! Upload ingestion
//!
//! Decodes the original and renders both derivatives before anything is written.
//! Only then is the original stored, the asset registered as `Processing`, the
//! derivatives stored and the asset flipped to `Ready`. An upload that fails
//! after registration is marked `Failed` and never served. Every failure path
//! removes the stored original.

use photostock_core::{AppError, LicenseClass, MediaAsset, NewMediaAsset, ProcessingStatus};
use photostock_db::CatalogStore;
use photostock_processing::{probe_original, DerivativePipeline, DerivativeSet, PipelineError, RenderError};
use photostock_storage::{keys, Storage, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid upload: {0}")]
    InvalidInput(String),

    #[error("Unsupported image: {0}")]
    UnsupportedImage(#[source] RenderError),

    #[error("Failed to store original: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Catalog(#[from] AppError),

    /// Rendering did not complete; nothing was stored or registered
    #[error("Derivative rendering failed: {0}")]
    Rendering(#[source] PipelineError),

    /// The asset was registered but left in the `Failed` state
    #[error("Derivative generation failed for asset {asset_id}: {source}")]
    Derivatives {
        asset_id: Uuid,
        #[source]
        source: PipelineError,
    },
}

/// An original submitted for publication
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub title: String,
    pub description: Option<String>,
    pub license: LicenseClass,
    pub category_id: i64,
    pub uploader_id: i64,
    pub filename: String,
    pub data: Vec<u8>,
}

/// A published asset and its derivatives
#[derive(Debug, Clone)]
pub struct IngestedAsset {
    pub asset: MediaAsset,
    pub derivatives: DerivativeSet,
}

#[derive(Clone)]
pub struct UploadService {
    catalog: Arc<dyn CatalogStore>,
    storage: Arc<dyn Storage>,
    pipeline: DerivativePipeline,
}

impl UploadService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        storage: Arc<dyn Storage>,
        pipeline: DerivativePipeline,
    ) -> Self {
        Self {
            catalog,
            storage,
            pipeline,
        }
    }

    #[tracing::instrument(skip(self, request, cancel), fields(uploader_id = request.uploader_id, size_bytes = request.data.len()))]
    pub async fn ingest(
        &self,
        request: UploadRequest,
        cancel: CancellationToken,
    ) -> Result<IngestedAsset, UploadError> {
        if request.title.trim().is_empty() {
            return Err(UploadError::InvalidInput("title must not be empty".to_string()));
        }
        if request.data.is_empty() {
            return Err(UploadError::InvalidInput("file is empty".to_string()));
        }

        let info = probe_original(&request.data).map_err(UploadError::UnsupportedImage)?;

        let rendered = match self.pipeline.render(request.data.clone(), cancel.clone()).await {
            Ok(rendered) => rendered,
            Err(PipelineError::Source(e)) => return Err(UploadError::UnsupportedImage(e)),
            Err(e) => return Err(UploadError::Rendering(e)),
        };

        let asset_id = Uuid::new_v4();
        let original_key = keys::original_key(asset_id, info.extension());
        let file_size = request.data.len() as i64;

        if let Err(e) = self
            .storage
            .upload_with_key(&original_key, request.data, info.content_type())
            .await
        {
            self.discard_original(&original_key).await;
            return Err(e.into());
        }

        let new_asset = NewMediaAsset {
            id: asset_id,
            title: request.title.trim().to_string(),
            description: request.description,
            license: request.license,
            category_id: request.category_id,
            uploader_id: request.uploader_id,
            original_key: original_key.clone(),
            original_filename: request.filename,
            content_type: info.content_type().to_string(),
            file_size,
            width: i32::try_from(info.width).ok(),
            height: i32::try_from(info.height).ok(),
        };

        let mut asset = match self.catalog.create_asset(new_asset).await {
            Ok(asset) => asset,
            Err(e) => {
                self.discard_original(&original_key).await;
                return Err(e.into());
            }
        };

        tracing::info!(asset_id = %asset_id, license = %asset.license, "Asset registered, storing derivatives");

        let derivatives = match self
            .pipeline
            .store_rendered(asset_id, rendered, &cancel)
            .await
        {
            Ok(derivatives) => derivatives,
            Err(source) => {
                tracing::warn!(asset_id = %asset_id, error = %source, "Asset left unpublished");
                if let Err(e) = self.set_status(asset_id, ProcessingStatus::Failed).await {
                    tracing::error!(asset_id = %asset_id, error = %e, "Failed to mark asset as failed");
                }
                self.discard_original(&original_key).await;
                return Err(UploadError::Derivatives { asset_id, source });
            }
        };

        if let Err(e) = self.set_status(asset_id, ProcessingStatus::Ready).await {
            if let Err(cleanup) = self.pipeline.remove(asset_id).await {
                tracing::error!(asset_id = %asset_id, error = %cleanup, "Failed to remove derivatives of unpublished asset");
            }
            self.discard_original(&original_key).await;
            return Err(e.into());
        }
        asset.processing_status = ProcessingStatus::Ready;

        Ok(IngestedAsset { asset, derivatives })
    }

    /// A missing row is an error: the asset vanished while it was processed
    async fn set_status(&self, asset_id: Uuid, status: ProcessingStatus) -> Result<(), AppError> {
        if self.catalog.update_processing_status(asset_id, status).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Media asset {} not found", asset_id)))
        }
    }

    async fn discard_original(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            tracing::error!(key = %key, error = %e, "Failed to remove original of unpublished asset");
        }
    }
}
