// src/lib.rs

//! BLS ingest library
//!
//! Tracks the files of a BLS time-series directory in an SCD Type 2 ledger,
//! downloads what changed, fetches population data and computes joined
//! metrics over both.

pub mod config;
pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
