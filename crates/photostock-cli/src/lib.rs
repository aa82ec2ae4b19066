//! Shared wiring for the `photostock` command line tool.

use std::sync::Arc;

use photostock_core::Config;
use photostock_db::{
    setup_database, CatalogRepository, DownloadHistoryRepository, PgDownloadLedger,
    SubscriptionRepository,
};
use photostock_processing::DerivativePipeline;
use photostock_services::{DownloadAccounting, LicensingService, SystemClock, UploadService};
use photostock_storage::LocalStorage;

/// Services backed by Postgres and local media storage
pub struct App {
    pub catalog: CatalogRepository,
    pub subscriptions: SubscriptionRepository,
    pub uploads: UploadService,
    pub licensing: LicensingService,
}

impl App {
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let pool = setup_database(config).await?;
        let storage = Arc::new(
            LocalStorage::new(config.storage_path.clone(), config.storage_base_url.clone()).await?,
        );
        let clock = Arc::new(SystemClock);

        let catalog = CatalogRepository::new(pool.clone());
        let subscriptions = SubscriptionRepository::new(pool.clone());
        let history = DownloadHistoryRepository::new(pool.clone());
        let ledger = PgDownloadLedger::new(pool);

        let pipeline = DerivativePipeline::new(config.derivatives.clone(), storage.clone());
        let uploads = UploadService::new(Arc::new(catalog.clone()), storage.clone(), pipeline);

        let accounting = DownloadAccounting::new(
            Arc::new(subscriptions.clone()),
            Arc::new(ledger),
            clock.clone(),
        );
        let licensing = LicensingService::new(
            Arc::new(catalog.clone()),
            Arc::new(subscriptions.clone()),
            Arc::new(history),
            storage,
            accounting,
            clock,
        );

        Ok(Self {
            catalog,
            subscriptions,
            uploads,
            licensing,
        })
    }
}

/// Shorten `s` to at most `max_chars` characters, ending in "..." when cut.
pub fn truncate_title(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Initialize tracing for the CLI. `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_title_short() {
        assert_eq!(truncate_title("Harbour", 10), "Harbour");
        assert_eq!(truncate_title("", 5), "");
    }

    #[test]
    fn truncate_title_long() {
        assert_eq!(truncate_title("Lighthouse in fog", 10), "Lightho...");
        assert_eq!(truncate_title("abc", 2), "...");
    }

    #[test]
    fn truncate_title_counts_characters() {
        assert_eq!(truncate_title("Île-de-France", 8), "Île-d...");
    }
}
