//! Service layer for ingestion and analysis.
//!
//! This module contains the I/O-facing building blocks:
//! - Directory listing collection (`ListingCollector`)
//! - Parallel file transfer (`BulkDownloader`)
//! - Population document download (`PopulationFetcher`)
//! - Metric computation (`analysis`)

pub mod analysis;
mod downloader;
mod listing;
mod population;

pub use downloader::{BulkDownloader, DownloadOutcome};
pub use listing::{ListingCollector, parse_listing};
pub use population::PopulationFetcher;
