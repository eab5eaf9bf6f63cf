//! Acadex Blueprint Import
//!
//! Onboards an institute from a ZIP of CSV files:
//! 1. Extracts the archive
//! 2. Parses every CSV file
//! 3. Writes institute, people and layout in one transaction
//! 4. Records the outcome on a blueprint upload row

mod archive;
mod blueprint;
mod errors;
mod processor;
#[cfg(test)]
mod test_support;

use acadex_common::{config::AppConfig, db::DbPool, VERSION};
use anyhow::Context;
use clap::Parser;
use processor::BlueprintProcessor;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "import-blueprint", version, about = "Import an institute blueprint archive")]
struct Args {
    /// ZIP archive with the blueprint CSV files
    #[arg(default_value = "institute_data.zip")]
    archive: PathBuf,

    /// Directory to extract into (defaults to import.extract_dir)
    #[arg(long)]
    extract_dir: Option<PathBuf>,

    /// User id recorded as the uploader
    #[arg(long)]
    uploaded_by: Option<i32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = AppConfig::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.pretty().init();
    }

    info!("Starting Acadex Blueprint Import v{}", VERSION);

    acadex_common::metrics::register_metrics();

    let db = DbPool::new(&config.database).await?;
    acadex_common::db::init_schema(db.conn()).await?;

    let extract_dir = args
        .extract_dir
        .unwrap_or_else(|| PathBuf::from(&config.import.extract_dir));

    let summary = BlueprintProcessor::new(db, extract_dir)
        .import(&args.archive, args.uploaded_by)
        .await
        .with_context(|| format!("import of {} failed", args.archive.display()))?;

    println!("{}", summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_defaults() {
        let args = Args::parse_from(["import-blueprint"]);
        assert_eq!(args.archive, PathBuf::from("institute_data.zip"));
        assert!(args.extract_dir.is_none());
        assert!(args.uploaded_by.is_none());
    }

    #[test]
    fn test_explicit_arguments() {
        let args = Args::parse_from([
            "import-blueprint",
            "north.zip",
            "--extract-dir",
            "/tmp/bp",
            "--uploaded-by",
            "7",
        ]);
        assert_eq!(args.archive, PathBuf::from("north.zip"));
        assert_eq!(args.extract_dir, Some(PathBuf::from("/tmp/bp")));
        assert_eq!(args.uploaded_by, Some(7));
    }
}
