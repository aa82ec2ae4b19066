//! Domain models for the catalog and licensing.

pub mod download;
pub mod media;
pub mod subscription;
pub mod upload;

pub use download::DownloadRecord;
pub use media::{
    format_file_size, LicenseClass, MediaAsset, NewMediaAsset, ProcessingStatus,
};
pub use subscription::{EntitlementSnapshot, PlanTerms, Subscription, SubscriptionPlan};
pub use upload::UploadRecord;
