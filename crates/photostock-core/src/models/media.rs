use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// License class of a media asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "license_class", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum LicenseClass {
    Free,
    Premium,
}

impl LicenseClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseClass::Free => "free",
            LicenseClass::Premium => "premium",
        }
    }

    pub fn is_premium(&self) -> bool {
        matches!(self, LicenseClass::Premium)
    }
}

impl fmt::Display for LicenseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(LicenseClass::Free),
            "premium" => Ok(LicenseClass::Premium),
            other => Err(format!("Invalid license class: {}", other)),
        }
    }
}

/// Derivative generation state of an asset. Only `Ready` assets are listed or served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "processing_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Processing,
    Ready,
    Failed,
}

/// Catalog entry for one uploaded original.
///
/// `id` is generated at upload time and doubles as the storage key stem for the
/// original and both derivatives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MediaAsset {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub license: LicenseClass,
    pub category_id: i64,
    pub uploader_id: i64,
    #[serde(skip_serializing)]
    pub original_key: String,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub processing_status: ProcessingStatus,
    pub download_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaAsset {
    pub fn is_ready(&self) -> bool {
        self.processing_status == ProcessingStatus::Ready
    }

    /// "4000x3000", or "unknown" when dimensions were not recorded
    pub fn resolution(&self) -> String {
        match (self.width, self.height) {
            (Some(w), Some(h)) => format!("{}x{}", w, h),
            _ => "unknown".to_string(),
        }
    }

    pub fn display_size(&self) -> String {
        format_file_size(self.file_size.max(0) as u64)
    }
}

/// Fields supplied by the upload flow when registering an asset.
#[derive(Debug, Clone)]
pub struct NewMediaAsset {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub license: LicenseClass,
    pub category_id: i64,
    pub uploader_id: i64,
    pub original_key: String,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

/// Human readable size using binary units ("512 B", "12 KB", "3.40 MB").
pub fn format_file_size(size: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let s = size as f64;
    if s >= GB {
        format!("{:.2} GB", s / GB)
    } else if s >= MB {
        format!("{:.2} MB", s / MB)
    } else if s >= KB {
        format!("{:.0} KB", s / KB)
    } else {
        format!("{} B", size)
    }
}
