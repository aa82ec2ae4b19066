//! Photostock Services Layer
//!
//! Orchestration on top of the stores, storage and derivative pipeline:
//! ingesting uploads, authorizing downloads and accounting for them.

pub mod accounting;
pub mod clock;
pub mod licensing;
pub mod upload;

pub use accounting::{AccountingError, AccountingOutcome, DownloadAccounting};
pub use clock::{Clock, FixedClock, SystemClock};
pub use licensing::{AccessCheck, Authorization, DownloadGrant, LicensingError, LicensingService};
pub use upload::{IngestedAsset, UploadError, UploadRequest, UploadService};
