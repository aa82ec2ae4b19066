//! Database repositories
//!
//! Store traits plus their Postgres implementations. The accounting ledger reuses
//! the same statements as the single-purpose repositories, run on one transaction.

pub mod catalog;
pub mod history;
pub mod ledger;
pub mod subscription;
pub mod traits;

pub use catalog::CatalogRepository;
pub use history::DownloadHistoryRepository;
pub use ledger::PgDownloadLedger;
pub use subscription::SubscriptionRepository;
pub use traits::{
    CatalogStore, CommitOutcome, DownloadLedger, HistoryStore, LedgerEntry, SubscriptionStore,
};
