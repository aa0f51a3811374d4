//! Pipeline entry points.
//!
//! - `run_ingest`: List the BLS directory, download changes, commit the ledger,
//!   then fetch the population document
//! - `run_analysis`: Compute metrics over the downloaded files

pub mod analyze;
pub mod ingest;
pub mod tracker;

pub use analyze::run_analysis;
pub use ingest::{
    BlsIngestSummary, IngestSummary, run_bls_ingest, run_ingest, run_population_ingest,
};
pub use tracker::{ChangeTracker, Reconciliation, load_ledger, persist_ledger};
