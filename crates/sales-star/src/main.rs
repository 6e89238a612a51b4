use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use sales_star_bucket::{BucketStore, LocalDirStore, S3BucketStore};
use sales_star_core::config::EtlConfig;
use sales_star_core::event::BatchEvent;
use sales_star_core::runner::{run_batch, CleanupStatus, RunReport};
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Builds a sales star schema from one batch of CSV extracts", long_about = None)]
struct Cli {
    /// Optional TOML configuration file; SALES_STAR_* variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the run report as JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process the batch held in an S3-compatible bucket and upload the archive next to it
    Run(RunArgs),
    /// Process the batch named by a storage notification payload
    Event(EventArgs),
    /// Process a batch from a local directory
    Local(LocalArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Bucket holding Customer.csv, Product.csv, Sales.csv, MarketCampaign.csv and Delivery.csv
    #[arg(long)]
    bucket: String,
}

#[derive(Args, Debug)]
struct EventArgs {
    /// Path to the JSON event, or `-` to read it from stdin
    #[arg(long, default_value = "-")]
    payload: String,
}

#[derive(Args, Debug)]
struct LocalArgs {
    /// Directory holding the five input extracts
    #[arg(long)]
    input_dir: PathBuf,
    /// Directory receiving the archive (defaults to the input directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = EtlConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    let report = match cli.command {
        Command::Run(args) => run_bucket(&config, &args.bucket).await?,
        Command::Event(args) => {
            let raw = read_payload(&args.payload).await?;
            let event = BatchEvent::from_json(&raw)?;
            info!(bucket = %event.bucket, object = ?event.object, "received batch notification");
            run_bucket(&config, &event.bucket).await?
        }
        Command::Local(args) => {
            let source = LocalDirStore::new(&args.input_dir);
            let sink = LocalDirStore::new(args.output_dir.unwrap_or(args.input_dir));
            run_batch(&source, &sink, &config)
                .await
                .context("ETL run failed")?
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

async fn run_bucket(config: &EtlConfig, bucket: &str) -> Result<RunReport> {
    let store = S3BucketStore::new(config.storage.s3_config(bucket))
        .await
        .with_context(|| format!("failed to configure bucket '{bucket}'"))?;
    let store: &dyn BucketStore = &store;

    run_batch(store, store, config)
        .await
        .with_context(|| format!("ETL run for bucket '{bucket}' failed"))
}

async fn read_payload(source: &str) -> Result<String> {
    if source == "-" {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .context("failed to read event from stdin")?;
        Ok(raw)
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("failed to read event file '{source}'"))
    }
}

fn print_report(report: &RunReport) {
    println!(
        "Run {} delivered {} ({} bytes) to {}",
        report.run_id, report.artifact_name, report.artifact_bytes, report.sink
    );

    let mut table = Table::new();
    table.set_header(vec!["Table", "File", "Rows", "Columns"]);
    for summary in &report.tables {
        table.add_row(vec![
            summary.table.to_string(),
            summary.file_name.clone(),
            summary.rows.to_string(),
            summary.columns.to_string(),
        ]);
    }
    println!("{table}");

    if let CleanupStatus::Failed(message) = &report.cleanup {
        println!("Warning: staging cleanup failed: {message}");
    }
}
