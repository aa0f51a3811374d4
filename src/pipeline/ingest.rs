// src/pipeline/ingest.rs

//! Ingestion pipeline: list, reconcile, download, commit, retire.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::Result;
use crate::models::{Config, PopulationConfig, time};
use crate::pipeline::tracker::{ChangeTracker, persist_ledger};
use crate::services::{BulkDownloader, ListingCollector, PopulationFetcher};
use crate::storage::Storage;
use crate::utils::http::{Fetch, HttpFetcher};
use crate::utils::join_location;
use crate::utils::retry::RetryPolicy;

/// What one BLS ingest run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlsIngestSummary {
    /// Files in the remote listing
    pub listed: usize,
    /// Files downloaded and committed to the ledger
    pub downloaded: Vec<String>,
    /// Files whose download failed; left for the next run
    pub failed: Vec<String>,
    /// Files retired from the ledger and deleted from storage
    pub retired: Vec<String>,
    pub ledger_written: bool,
}

/// What a full ingest run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub run_timestamp: String,
    pub bls: BlsIngestSummary,
    /// Where the population document was written, if configured
    pub population: Option<String>,
}

/// Track and download the BLS directory.
///
/// Downloads run to completion before the ledger is written; failed downloads
/// are left out of the committed ledger. Retired files are deleted only after
/// the ledger is saved, and a failed delete is logged without failing the run.
pub async fn run_bls_ingest(
    config: &Config,
    storage: &Storage,
    fetcher: Arc<dyn Fetch>,
    now: NaiveDateTime,
) -> Result<BlsIngestSummary> {
    let bls = &config.bls;
    let retry = RetryPolicy::from_config(&config.http);

    let collector = ListingCollector::from_config(fetcher.clone(), bls, retry.clone())?;
    let files = collector.list_remote_files(&bls.directory_url()).await?;

    let ledger_location = bls.ledger_location();
    let tracker = ChangeTracker::new(bls.file_tracking.duplicate_policy);
    let mut reconciliation = tracker
        .reconcile_at(storage, &ledger_location, &files, now)
        .await?;

    let mut summary = BlsIngestSummary {
        listed: files.len(),
        ..Default::default()
    };

    if !reconciliation.has_changes() {
        log::info!("No updates or deletions found");
        return Ok(summary);
    }

    let target_directory = &bls.download.target_directory;
    let tasks = reconciliation.download_tasks(target_directory);
    let downloader = BulkDownloader::new(fetcher, storage.clone(), retry);
    let outcomes = downloader
        .download_all(tasks, bls.download.max_workers)
        .await;

    for outcome in &outcomes {
        if outcome.is_success() {
            summary.downloaded.push(outcome.task.file_name.clone());
        } else {
            summary.failed.push(outcome.task.file_name.clone());
        }
    }
    summary.downloaded.sort();
    summary.failed.sort();

    if !summary.failed.is_empty() {
        log::warn!(
            "{} downloads failed and will be retried next run: {}",
            summary.failed.len(),
            summary.failed.join(", ")
        );
        reconciliation.discard_additions(summary.failed.iter().map(String::as_str));
    }

    if reconciliation.has_changes() {
        persist_ledger(storage, &ledger_location, &reconciliation.ledger).await?;
        summary.ledger_written = true;
    }

    for name in &reconciliation.retirements {
        let location = join_location(target_directory, name);
        match storage.delete(&location).await {
            Ok(()) => log::info!("Removed retired file {}", location),
            Err(e) => log::error!("Failed to delete retired file {}: {}", location, e),
        }
    }
    summary.retired = reconciliation.retirements.clone();

    Ok(summary)
}

/// Fetch the population document and store it.
pub async fn run_population_ingest(
    population: &PopulationConfig,
    storage: &Storage,
    fetcher: Arc<dyn Fetch>,
    retry: RetryPolicy,
) -> Result<String> {
    PopulationFetcher::new(fetcher, storage.clone(), retry)
        .fetch_and_store(population)
        .await
}

/// Run a complete ingest: BLS directory first, then population.
pub async fn run_ingest(
    config: &Config,
    storage: &Storage,
    skip_population: bool,
) -> Result<IngestSummary> {
    let now = time::run_timestamp_now();
    log::info!("Starting ingest run at {}", now.format(time::RUN_FORMAT));

    let bls_fetcher: Arc<dyn Fetch> =
        Arc::new(HttpFetcher::from_config(&config.http, &config.bls.headers)?);
    let bls = run_bls_ingest(config, storage, bls_fetcher, now).await?;
    log::info!(
        "BLS ingest complete: {} listed, {} downloaded, {} failed, {} retired",
        bls.listed,
        bls.downloaded.len(),
        bls.failed.len(),
        bls.retired.len()
    );

    let population = match (&config.population, skip_population) {
        (Some(population), false) => {
            let fetcher: Arc<dyn Fetch> =
                Arc::new(HttpFetcher::from_config(&config.http, &population.headers)?);
            let retry = RetryPolicy::from_config(&config.http);
            Some(run_population_ingest(population, storage, fetcher, retry).await?)
        }
        (Some(_), true) => {
            log::info!("Skipping population download");
            None
        }
        (None, _) => None,
    };

    Ok(IngestSummary {
        run_timestamp: now.format(time::RUN_FORMAT).to_string(),
        bls,
        population,
    })
}
