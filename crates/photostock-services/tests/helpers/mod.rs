//! Shared setup for service integration tests: in-memory stores, local storage
//! in a temporary directory and the bundled watermark font.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use image::{ImageFormat, Rgb, RgbImage};
use photostock_core::{DerivativeConfig, LicenseClass, MediaAsset, WatermarkConfig};
use photostock_db::MemoryStore;
use photostock_processing::DerivativePipeline;
use photostock_services::{
    DownloadAccounting, FixedClock, LicensingService, UploadRequest, UploadService,
};
use photostock_storage::{keys, LocalStorage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub const FONT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../assets/fonts/DejaVuSans.ttf");

pub struct TestWorld {
    pub store: MemoryStore,
    pub storage: Arc<LocalStorage>,
    pub uploads: UploadService,
    pub licensing: LicensingService,
    pub now: DateTime<Utc>,
    _dir: TempDir,
}

pub async fn setup_world() -> TestWorld {
    setup_world_with_font(FONT).await
}

pub async fn setup_world_with_font(font_path: &str) -> TestWorld {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage = Arc::new(
        LocalStorage::new(dir.path(), "http://localhost:8080/media".to_string())
            .await
            .expect("Failed to create local storage"),
    );

    let store = MemoryStore::new();
    let now = Utc::now();
    let clock = Arc::new(FixedClock(now));

    let pipeline = DerivativePipeline::new(derivative_config(font_path), storage.clone());

    let uploads = UploadService::new(Arc::new(store.clone()), storage.clone(), pipeline);
    let accounting = DownloadAccounting::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        clock.clone(),
    );
    let licensing = LicensingService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        storage.clone(),
        accounting,
        clock,
    );

    TestWorld {
        store,
        storage,
        uploads,
        licensing,
        now,
        _dir: dir,
    }
}

impl TestWorld {
    /// Number of originals currently held in storage
    pub fn stored_originals(&self) -> usize {
        count_files(&self._dir.path().join(keys::ORIGINAL_PREFIX))
    }
}

pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(Result::ok).count())
        .unwrap_or(0)
}

pub fn derivative_config(font_path: &str) -> DerivativeConfig {
    DerivativeConfig {
        watermark: WatermarkConfig {
            font_path: PathBuf::from(font_path),
            ..WatermarkConfig::default()
        },
        ..DerivativeConfig::default()
    }
}

/// PNG whose header is intact but whose pixel data is cut short
pub fn truncated_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 7]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("Failed to encode test image");
    buf.truncate(buf.len() / 2);
    buf
}

/// JPEG with a diagonal gradient so both renderers have real content to work on
pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let v = ((x + y) % 256) as u8;
        Rgb([v, 255 - v, 128])
    });
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .expect("Failed to encode test image");
    buf
}

pub fn upload_request(license: LicenseClass, data: Vec<u8>) -> UploadRequest {
    UploadRequest {
        title: "Lighthouse in fog".to_string(),
        description: Some("Long exposure".to_string()),
        license,
        category_id: 1,
        uploader_id: 42,
        filename: "lighthouse.jpg".to_string(),
        data,
    }
}

/// Upload a small original and return the published asset
pub async fn publish(world: &TestWorld, license: LicenseClass) -> MediaAsset {
    world
        .uploads
        .ingest(upload_request(license, jpeg(640, 480)), CancellationToken::new())
        .await
        .expect("Failed to publish asset")
        .asset
}
