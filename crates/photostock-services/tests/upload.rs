mod helpers;

use async_trait::async_trait;
use helpers::{
    count_files, derivative_config, jpeg, setup_world, setup_world_with_font, truncated_png,
    upload_request, FONT,
};
use image::GenericImageView;
use photostock_core::{
    AppError, LicenseClass, MediaAsset, NewMediaAsset, ProcessingStatus, UploadRecord,
};
use photostock_db::{CatalogStore, MemoryStore};
use photostock_processing::{DerivativeKind, DerivativePipeline, PipelineError, RenderError};
use photostock_services::{UploadError, UploadService};
use photostock_storage::{keys, ByteStream, LocalStorage, Storage, StorageError, StorageResult};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[tokio::test]
async fn test_upload_publishes_asset_with_derivatives() {
    let world = setup_world().await;
    let original = jpeg(4000, 3000);

    let ingested = world
        .uploads
        .ingest(
            upload_request(LicenseClass::Premium, original.clone()),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let asset = &ingested.asset;
    assert_eq!(asset.processing_status, ProcessingStatus::Ready);
    assert_eq!(asset.width, Some(4000));
    assert_eq!(asset.height, Some(3000));
    assert_eq!(asset.content_type, "image/jpeg");
    assert_eq!(asset.file_size, original.len() as i64);

    let stored = world.store.get_asset_by_id(asset.id).await.unwrap().unwrap();
    assert!(stored.is_ready());
    assert_eq!(world.storage.download(&asset.original_key).await.unwrap(), original);

    let thumb = &ingested.derivatives.thumbnail;
    assert_eq!(thumb.key, keys::thumbnail_key(asset.id));
    assert_eq!((thumb.width, thumb.height), (300, 300));
    let thumb_bytes = world.storage.download(&thumb.key).await.unwrap();
    let decoded = image::load_from_memory(&thumb_bytes).unwrap();
    assert_eq!(decoded.dimensions(), (300, 300));

    let mark = &ingested.derivatives.watermark;
    assert_eq!(mark.key, keys::watermark_key(asset.id));
    assert_eq!(mark.content_type, "image/png");
    assert_eq!((mark.width, mark.height), (720, 540));
    let mark_bytes = world.storage.download(&mark.key).await.unwrap();
    let decoded = image::load_from_memory(&mark_bytes).unwrap();
    assert!(decoded.width() <= 720 && decoded.height() <= 720);
}

#[tokio::test]
async fn test_missing_font_registers_nothing() {
    let world = setup_world_with_font("/nonexistent/fonts/missing.ttf").await;

    let result = world
        .uploads
        .ingest(
            upload_request(LicenseClass::Free, jpeg(800, 600)),
            CancellationToken::new(),
        )
        .await;

    let Err(UploadError::Rendering(source)) = result else {
        panic!("expected rendering failure");
    };
    assert!(matches!(
        source.render_failure(DerivativeKind::Watermark),
        Some(RenderError::Font { .. })
    ));

    assert_eq!(world.store.asset_count(), 0);
    assert_eq!(world.stored_originals(), 0);
    assert!(world.store.list_uploads_by_user(42, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_body_never_reaches_catalog() {
    let world = setup_world().await;

    let result = world
        .uploads
        .ingest(
            upload_request(LicenseClass::Free, truncated_png(400, 300)),
            CancellationToken::new(),
        )
        .await;

    assert!(matches!(
        result,
        Err(UploadError::UnsupportedImage(RenderError::Decode(_)))
    ));
    assert_eq!(world.store.asset_count(), 0);
    assert_eq!(world.stored_originals(), 0);
}

#[tokio::test]
async fn test_upload_is_recorded_in_upload_history() {
    let world = setup_world().await;
    let original = jpeg(640, 480);

    let asset = world
        .uploads
        .ingest(
            upload_request(LicenseClass::Free, original.clone()),
            CancellationToken::new(),
        )
        .await
        .unwrap()
        .asset;

    let uploads = world.store.list_uploads_by_user(42, 10).await.unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].asset_id, asset.id);
    assert_eq!(uploads[0].file_size, original.len() as i64);
    assert_eq!(world.stored_originals(), 1);
}

/// Local storage that refuses every derivative write
struct DerivativeWritesFail(LocalStorage);

#[async_trait]
impl Storage for DerivativeWritesFail {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String> {
        if storage_key.starts_with("derivatives/") {
            return Err(StorageError::Unavailable("disk full".to_string()));
        }
        self.0.upload_with_key(storage_key, data, content_type).await
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.0.download(storage_key).await
    }

    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        self.0.download_stream(storage_key).await
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.0.delete(storage_key).await
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        self.0.exists(storage_key).await
    }
}

/// Catalog whose rows disappear before their status can be updated
struct VanishingCatalog(MemoryStore);

#[async_trait]
impl CatalogStore for VanishingCatalog {
    async fn create_asset(&self, asset: NewMediaAsset) -> Result<MediaAsset, AppError> {
        self.0.create_asset(asset).await
    }

    async fn get_asset_by_id(&self, id: Uuid) -> Result<Option<MediaAsset>, AppError> {
        self.0.get_asset_by_id(id).await
    }

    async fn increment_asset_download_count(&self, id: Uuid) -> Result<bool, AppError> {
        self.0.increment_asset_download_count(id).await
    }

    async fn update_processing_status(
        &self,
        _id: Uuid,
        _status: ProcessingStatus,
    ) -> Result<bool, AppError> {
        Ok(false)
    }

    async fn list_uploads_by_user(
        &self,
        uploader_id: i64,
        limit: i64,
    ) -> Result<Vec<UploadRecord>, AppError> {
        self.0.list_uploads_by_user(uploader_id, limit).await
    }
}

async fn local_storage(dir: &Path) -> LocalStorage {
    LocalStorage::new(dir, "http://localhost:8080/media".to_string())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_derivative_write_failure_marks_asset_failed() {
    let dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn Storage> = Arc::new(DerivativeWritesFail(local_storage(dir.path()).await));
    let store = MemoryStore::new();
    let uploads = UploadService::new(
        Arc::new(store.clone()),
        storage.clone(),
        DerivativePipeline::new(derivative_config(FONT), storage),
    );

    let result = uploads
        .ingest(
            upload_request(LicenseClass::Premium, jpeg(640, 480)),
            CancellationToken::new(),
        )
        .await;

    let Err(UploadError::Derivatives { asset_id, source }) = result else {
        panic!("expected derivative storage failure");
    };
    assert!(matches!(
        source,
        PipelineError::Storage {
            kind: DerivativeKind::Thumbnail,
            ..
        }
    ));

    let asset = store.get_asset_by_id(asset_id).await.unwrap().unwrap();
    assert_eq!(asset.processing_status, ProcessingStatus::Failed);
    assert_eq!(count_files(&dir.path().join(keys::ORIGINAL_PREFIX)), 0);
}

#[tokio::test]
async fn test_vanished_row_is_not_published() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(local_storage(dir.path()).await);
    let uploads = UploadService::new(
        Arc::new(VanishingCatalog(MemoryStore::new())),
        storage.clone(),
        DerivativePipeline::new(derivative_config(FONT), storage.clone()),
    );

    let result = uploads
        .ingest(
            upload_request(LicenseClass::Free, jpeg(320, 240)),
            CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(UploadError::Catalog(AppError::NotFound(_)))));
    assert_eq!(count_files(&dir.path().join(keys::ORIGINAL_PREFIX)), 0);
    assert_eq!(count_files(&dir.path().join(keys::THUMBNAIL_PREFIX)), 0);
    assert_eq!(count_files(&dir.path().join(keys::WATERMARK_PREFIX)), 0);
}

#[tokio::test]
async fn test_invalid_uploads_are_rejected() {
    let world = setup_world().await;

    let empty = world
        .uploads
        .ingest(upload_request(LicenseClass::Free, Vec::new()), CancellationToken::new())
        .await;
    assert!(matches!(empty, Err(UploadError::InvalidInput(_))));

    let garbage = world
        .uploads
        .ingest(
            upload_request(LicenseClass::Free, b"definitely not an image".to_vec()),
            CancellationToken::new(),
        )
        .await;
    assert!(matches!(garbage, Err(UploadError::UnsupportedImage(_))));

    let mut untitled = upload_request(LicenseClass::Free, jpeg(64, 64));
    untitled.title = "   ".to_string();
    let untitled = world
        .uploads
        .ingest(untitled, CancellationToken::new())
        .await;
    assert!(matches!(untitled, Err(UploadError::InvalidInput(_))));
}

#[tokio::test]
async fn test_cancelled_upload_is_not_published() {
    let world = setup_world().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = world
        .uploads
        .ingest(upload_request(LicenseClass::Free, jpeg(320, 240)), cancel)
        .await;

    assert!(matches!(
        result,
        Err(UploadError::Rendering(PipelineError::Cancelled))
    ));
    assert_eq!(world.store.asset_count(), 0);
    assert_eq!(world.stored_originals(), 0);
}
