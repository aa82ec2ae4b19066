//! Configuration module
//!
//! Environment-driven configuration for the database, storage and derivative
//! generation. Derivative settings are plain structs handed to the renderers at
//! construction so tests and deployments can tune them without globals.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Watermark compositor settings
#[derive(Clone, Debug, PartialEq)]
pub struct WatermarkConfig {
    pub text: String,
    pub font_path: PathBuf,
    pub font_size: f32,
    /// Global alpha applied to the mark, 0.0..=1.0
    pub opacity: f32,
    /// Rotation of the tiling frame about the image center
    pub angle_degrees: f32,
    /// Width the source is normalised to before compositing
    pub max_working_width: u32,
    /// Bounding box (square) the composited render is fitted into
    pub final_max_box: u32,
    /// Pixels skipped between brightness samples
    pub sample_stride: u32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: constants::WATERMARK_TEXT.to_string(),
            font_path: PathBuf::from(constants::WATERMARK_FONT_PATH),
            font_size: constants::WATERMARK_FONT_SIZE,
            opacity: constants::WATERMARK_OPACITY,
            angle_degrees: constants::WATERMARK_ANGLE_DEGREES,
            max_working_width: constants::WATERMARK_MAX_WORKING_WIDTH,
            final_max_box: constants::WATERMARK_FINAL_MAX_BOX,
            sample_stride: constants::BRIGHTNESS_SAMPLE_STRIDE,
        }
    }
}

impl WatermarkConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.text.trim().is_empty() {
            return Err(anyhow::anyhow!("WATERMARK_TEXT must not be empty"));
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(anyhow::anyhow!("WATERMARK_FONT_SIZE must be positive"));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(anyhow::anyhow!(
                "WATERMARK_OPACITY must be between 0.0 and 1.0"
            ));
        }
        if self.max_working_width == 0 || self.final_max_box == 0 {
            return Err(anyhow::anyhow!(
                "WATERMARK_MAX_WORKING_WIDTH and WATERMARK_FINAL_MAX_BOX must be positive"
            ));
        }
        Ok(())
    }
}

/// Thumbnail generator settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThumbnailConfig {
    /// Side of the square box thumbnails are cropped to
    pub size: u32,
    pub jpeg_quality: u8,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            size: constants::THUMBNAIL_SIZE,
            jpeg_quality: constants::THUMBNAIL_JPEG_QUALITY,
        }
    }
}

/// Settings for both derivative generators
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DerivativeConfig {
    pub watermark: WatermarkConfig,
    pub thumbnail: ThumbnailConfig,
}

impl DerivativeConfig {
    /// Derivative settings only. Does not require `DATABASE_URL`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = WatermarkConfig::default();
        let watermark = WatermarkConfig {
            text: env::var("WATERMARK_TEXT").unwrap_or(defaults.text),
            font_path: env::var("WATERMARK_FONT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.font_path),
            font_size: env_or("WATERMARK_FONT_SIZE", defaults.font_size),
            opacity: env_or("WATERMARK_OPACITY", defaults.opacity),
            angle_degrees: env_or("WATERMARK_ANGLE_DEGREES", defaults.angle_degrees),
            max_working_width: env_or("WATERMARK_MAX_WORKING_WIDTH", defaults.max_working_width),
            final_max_box: env_or("WATERMARK_FINAL_MAX_BOX", defaults.final_max_box),
            sample_stride: env_or("BRIGHTNESS_SAMPLE_STRIDE", defaults.sample_stride),
        };

        let thumbnail = ThumbnailConfig {
            size: env_or("THUMBNAIL_SIZE", constants::THUMBNAIL_SIZE),
            jpeg_quality: env_or("THUMBNAIL_JPEG_QUALITY", constants::THUMBNAIL_JPEG_QUALITY),
        };

        Self {
            watermark,
            thumbnail,
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.thumbnail.size == 0 {
            return Err(anyhow::anyhow!("THUMBNAIL_SIZE must be positive"));
        }
        self.watermark.validate()
    }
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    pub storage_path: PathBuf,
    pub storage_base_url: String,
    pub derivatives: DerivativeConfig,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        Ok(Config {
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            environment,
            storage_path: env::var("MEDIA_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./assets/media")),
            storage_base_url: env::var("MEDIA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/media".to_string()),
            derivatives: DerivativeConfig::from_env(),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.database_url.starts_with("postgresql://")
            || self.database_url.starts_with("postgres://"))
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        self.derivatives.validate()?;

        if self.is_production() && !self.derivatives.watermark.font_path.exists() {
            return Err(anyhow::anyhow!(
                "WATERMARK_FONT_PATH {} does not exist",
                self.derivatives.watermark.font_path.display()
            ));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            database_url: "postgresql://localhost/photostock".to_string(),
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            environment: "development".to_string(),
            storage_path: PathBuf::from("/tmp/photostock"),
            storage_base_url: "http://localhost:8080/media".to_string(),
            derivatives: DerivativeConfig::default(),
        }
    }

    #[test]
    fn test_watermark_defaults() {
        let wm = WatermarkConfig::default();
        assert_eq!(wm.max_working_width, 1200);
        assert_eq!(wm.final_max_box, 720);
        assert_eq!(wm.opacity, 0.5);
        assert_eq!(wm.sample_stride, 20);
        assert!(wm.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_postgres_url() {
        let mut cfg = config();
        assert!(cfg.validate().is_ok());
        cfg.database_url = "mysql://localhost/photostock".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_opacity() {
        let mut cfg = config();
        cfg.derivatives.watermark.opacity = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_text() {
        let mut cfg = config();
        cfg.derivatives.watermark.text = "  ".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_is_production() {
        let mut cfg = config();
        assert!(!cfg.is_production());
        cfg.environment = "Prod".to_string();
        assert!(cfg.is_production());
    }
}
