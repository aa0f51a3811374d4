// src/models/mod.rs

//! Domain models for ingestion and analysis.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod analysis;
mod config;
mod ledger;
mod remote;
pub mod time;

// Re-export all public types
pub use analysis::{
    AnalysisReport, BlsObservation, CombinedRow, PopulationDocument, PopulationRecord,
    PopulationStats, SeriesBestYear,
};
pub use config::{
    AnalysisConfig, AnalysisSource, BlsConfig, Config, DownloadConfig, DuplicatePolicy,
    FileTrackingConfig, HeaderConfig, HttpConfig, MetricsConfig, PopulationConfig,
    PopulationDownloadConfig, ScrapingConfig,
};
pub use ledger::{LEDGER_COLUMNS, Ledger, LedgerEntry};
pub use remote::{DownloadTask, RemoteFile};
