//! Photostock persistence layer
//!
//! Store traits for the catalog, subscriptions, download history and the
//! accounting ledger, with Postgres (`sqlx`) and in-memory implementations.

pub mod db;
pub mod memory;
pub mod setup;

pub use db::{
    CatalogRepository, CatalogStore, CommitOutcome, DownloadHistoryRepository, DownloadLedger,
    HistoryStore, LedgerEntry, PgDownloadLedger, SubscriptionRepository, SubscriptionStore,
};
pub use memory::MemoryStore;
pub use setup::setup_database;
