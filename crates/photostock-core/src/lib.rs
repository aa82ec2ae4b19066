//! Photostock Core Library
//!
//! Domain models, error types, configuration and the entitlement rules shared by
//! every Photostock component.

pub mod config;
pub mod constants;
pub mod entitlement;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{Config, DerivativeConfig, ThumbnailConfig, WatermarkConfig};
pub use entitlement::{can_purchase, evaluate, Decision, DenyReason};
pub use error::AppError;
pub use models::{
    DownloadRecord, EntitlementSnapshot, LicenseClass, MediaAsset, NewMediaAsset,
    ProcessingStatus, Subscription, SubscriptionPlan, UploadRecord,
};
