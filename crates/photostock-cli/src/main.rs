use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use photostock_core::{Config, DerivativeConfig, LicenseClass};
use photostock_db::CatalogStore;
use photostock_processing::DerivativePipeline;
use photostock_services::{Authorization, UploadRequest};
use photostock_storage::LocalStorage;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use photostock_cli::{init_tracing, truncate_title, App};

#[derive(Parser, Debug)]
#[command(name = "photostock")]
#[command(about = "Publish stock photos and license their downloads")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the thumbnail and watermarked preview of a local image
    Derive {
        /// Original image to render from
        path: PathBuf,

        /// Asset id used for the derivative keys (random if omitted)
        #[arg(long, value_name = "UUID")]
        asset_id: Option<Uuid>,

        /// Directory the derivatives are written to
        #[arg(long, env = "MEDIA_STORAGE_PATH", default_value = "./assets/media")]
        out_dir: PathBuf,
    },

    /// Store an original, register it and generate its derivatives
    Upload {
        path: PathBuf,

        #[arg(long)]
        title: String,

        #[arg(long)]
        description: Option<String>,

        /// free or premium
        #[arg(long, default_value = "free")]
        license: LicenseClass,

        #[arg(long)]
        category_id: i64,

        #[arg(long)]
        uploader_id: i64,
    },

    /// Evaluate a user's entitlement to an asset without recording anything
    CheckAccess {
        #[arg(long)]
        user_id: i64,

        #[arg(long, value_name = "UUID")]
        asset_id: Uuid,
    },

    /// Authorize, commit and save a download of the original
    Download {
        #[arg(long)]
        user_id: i64,

        #[arg(long, value_name = "UUID")]
        asset_id: Uuid,

        /// File the original is written to (defaults to the uploaded filename)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List a user's downloads, newest first
    History {
        #[arg(long)]
        user_id: i64,

        #[arg(long, default_value = "20")]
        limit: i64,
    },

    /// List an uploader's uploads, newest first
    Uploads {
        #[arg(long)]
        uploader_id: i64,

        #[arg(long, default_value = "20")]
        limit: i64,
    },

    /// List published assets
    Assets {
        #[arg(long, default_value = "50")]
        limit: i64,

        #[arg(long, default_value = "0")]
        offset: i64,
    },

    /// List subscription plans on sale
    Plans,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    match args.command {
        Command::Derive {
            path,
            asset_id,
            out_dir,
        } => derive(path, asset_id, out_dir).await,
        command => {
            let config = Config::from_env()?;
            config.validate()?;
            let app = App::connect(&config).await?;
            run(&app, command).await
        }
    }
}

/// Cancel in-flight work on Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            token.cancel();
        }
    });
    cancel
}

async fn derive(path: PathBuf, asset_id: Option<Uuid>, out_dir: PathBuf) -> Result<()> {
    let config = DerivativeConfig::from_env();
    config.validate()?;

    let base_url = format!("file://{}", out_dir.display());
    let storage = Arc::new(LocalStorage::new(out_dir, base_url).await?);
    let pipeline = DerivativePipeline::new(config, storage);

    let asset_id = asset_id.unwrap_or_else(Uuid::new_v4);
    let set = pipeline
        .generate(&path, asset_id, cancel_on_ctrl_c())
        .await
        .with_context(|| format!("Failed to derive {}", path.display()))?;

    let describe = |d: &photostock_processing::StoredDerivative| {
        serde_json::json!({
            "key": d.key,
            "url": d.url,
            "width": d.width,
            "height": d.height,
            "size_bytes": d.size_bytes,
            "content_type": d.content_type,
        })
    };
    let output = serde_json::json!({
        "asset_id": set.asset_id,
        "thumbnail": describe(&set.thumbnail),
        "watermark": describe(&set.watermark),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Derive {
            path,
            asset_id,
            out_dir,
        } => derive(path, asset_id, out_dir).await?,
        Command::Upload {
            path,
            title,
            description,
            license,
            category_id,
            uploader_id,
        } => {
            let data = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "original".to_string());

            let ingested = app
                .uploads
                .ingest(
                    UploadRequest {
                        title,
                        description,
                        license,
                        category_id,
                        uploader_id,
                        filename,
                        data,
                    },
                    cancel_on_ctrl_c(),
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&ingested.asset)?);
        }
        Command::CheckAccess { user_id, asset_id } => {
            let check = app.licensing.check_access(user_id, asset_id).await?;
            println!("{}", serde_json::to_string_pretty(&check)?);
        }
        Command::Download {
            user_id,
            asset_id,
            out,
        } => match app.licensing.authorize_download(user_id, asset_id).await? {
            Authorization::Denied(reason) => {
                anyhow::bail!("{} ({})", reason.message(), reason.code());
            }
            Authorization::Granted(grant) => {
                let out = out.unwrap_or_else(|| PathBuf::from(&grant.filename));
                let mut stream = app.licensing.open_download(&grant).await?;
                let mut file = tokio::fs::File::create(&out)
                    .await
                    .with_context(|| format!("Failed to create {}", out.display()))?;
                while let Some(chunk) = stream.next().await {
                    file.write_all(&chunk?).await?;
                }
                file.flush().await?;

                tracing::info!(path = %out.display(), size = %grant.display_size, "Original saved");
                println!("{}", serde_json::to_string_pretty(&grant)?);
            }
        },
        Command::History { user_id, limit } => {
            let records = app.licensing.download_history(user_id, limit).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Uploads { uploader_id, limit } => {
            let records = app.catalog.list_uploads_by_user(uploader_id, limit).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Assets { limit, offset } => {
            let assets = app.catalog.list_ready_assets(limit, offset).await?;
            println!(
                "{:<38} {:<8} {:<32} {:>10} {:>10}",
                "ID", "LICENSE", "TITLE", "SIZE", "DOWNLOADS"
            );
            for asset in assets {
                println!(
                    "{:<38} {:<8} {:<32} {:>10} {:>10}",
                    asset.id,
                    asset.license,
                    truncate_title(&asset.title, 32),
                    asset.display_size(),
                    asset.download_count
                );
            }
        }
        Command::Plans => {
            let plans = app.subscriptions.list_active_plans().await?;
            println!("{}", serde_json::to_string_pretty(&plans)?);
        }
    }
    Ok(())
}
