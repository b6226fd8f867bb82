use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use stockmarket_backend::logging::{init_logging, LoggingConfig};
use stockmarket_backend::services::csv_import_service;

/// Import stock metadata and daily prices from a folder of CSV files.
#[derive(Debug, Parser)]
#[command(name = "import-csv", version)]
struct Args {
    /// Folder containing stock_metadata.csv and one price CSV per stock
    dataset_path: PathBuf,

    /// Overrides DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_logging(LoggingConfig::for_service("stockmarket-import")).map_err(|e| anyhow!("{}", e))?;

    let database_url = match args.database_url {
        Some(url) => url,
        None => std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?,
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .context("Failed to connect to the database")?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let summary = csv_import_service::import_dataset(&pool, &args.dataset_path).await?;
    println!(
        "Imported {} stocks and {} price records from {} files ({} failed, {} rows skipped).",
        summary.stocks_upserted,
        summary.records_upserted,
        summary.files_processed,
        summary.files_failed,
        summary.rows_skipped
    );
    Ok(())
}
