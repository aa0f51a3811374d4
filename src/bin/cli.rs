//! bls-ingest CLI
//!
//! Local execution entry point. For AWS Lambda, use `bls-ingest-lambda`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use bls_ingest::{
    config::load_config,
    error::Result,
    pipeline::{self, load_ledger},
    storage::Storage,
    utils::retry::RetryPolicy,
};

/// Track, download and analyze BLS time-series files
#[derive(Parser, Debug)]
#[command(
    name = "bls-ingest",
    version,
    about = "BLS directory change tracker and population analysis"
)]
struct Cli {
    /// Configuration location (local path or s3://bucket/key)
    #[arg(short, long, env = "CONFIG_PATH", default_value = "data/config.toml")]
    config: String,

    /// Directory relative local paths are resolved against
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the BLS directory, download changes and update the ledger
    Ingest {
        /// Do not download the population document
        #[arg(long)]
        skip_population: bool,
    },

    /// Compute metrics over the downloaded files
    Analyze,

    /// Validate the configuration file
    Validate,

    /// Show the current ledger
    Ledger {
        /// Include inactive (historical) rows
        #[arg(long)]
        all: bool,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[cfg(feature = "s3")]
async fn build_storage(root: PathBuf) -> Storage {
    let client = bls_ingest::storage::S3Storage::client_from_env().await;
    Storage::local(root).with_s3(client)
}

#[cfg(not(feature = "s3"))]
async fn build_storage(root: PathBuf) -> Storage {
    Storage::local(root)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("bls-ingest starting...");

    let storage = build_storage(cli.root).await;
    let config = load_config(&storage, &cli.config).await?;
    let storage = storage.with_retry(RetryPolicy::from_config(&config.http));

    log::info!("Loaded configuration from {}", cli.config);

    match cli.command {
        Command::Ingest { skip_population } => {
            let summary = pipeline::run_ingest(&config, &storage, skip_population).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);

            if !summary.bls.failed.is_empty() {
                log::warn!(
                    "Ingest finished with {} failed downloads",
                    summary.bls.failed.len()
                );
            }
        }

        Command::Analyze => {
            let report = pipeline::run_analysis(&config, &storage).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Validate => {
            // load_config already validated; report what was loaded
            config.bls.file_pattern()?;
            log::info!("✓ BLS directory: {}", config.bls.directory_url());
            log::info!("✓ Ledger: {}", config.bls.ledger_location());
            match &config.population {
                Some(population) => {
                    log::info!("✓ Population output: {}", population.output_location())
                }
                None => log::info!("- No [population] section"),
            }
            match &config.analysis {
                Some(analysis) => log::info!(
                    "✓ Analysis inputs: {}, {}",
                    analysis.bls.location(),
                    analysis.population.location()
                ),
                None => log::info!("- No [analysis] section"),
            }
            log::info!("All validations passed!");
        }

        Command::Ledger { all } => {
            let location = config.bls.ledger_location();
            match load_ledger(&storage, &location).await? {
                Some(ledger) => {
                    let active = ledger.active().count();
                    log::info!(
                        "Ledger {}: {} rows, {} active",
                        location,
                        ledger.len(),
                        active
                    );
                    for entry in ledger.entries().iter().filter(|e| all || e.is_active) {
                        println!(
                            "{}\t{}\t{}\t{}",
                            if entry.is_active { "Y" } else { "N" },
                            entry.file_name,
                            entry.file_timestamp.format(bls_ingest::models::time::LISTING_FORMAT),
                            entry.full_url
                        );
                    }
                }
                None => log::info!("No ledger found at {}", location),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
