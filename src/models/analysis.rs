// src/models/analysis.rs

//! Records read by the analysis step and the report it produces.

use serde::{Deserialize, Serialize};

/// One row of the BLS current-data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlsObservation {
    pub series_id: String,
    pub year: i32,
    pub period: String,
    pub value: f64,
}

/// Population API document; only `data` is used.
#[derive(Debug, Clone, Deserialize)]
pub struct PopulationDocument {
    pub data: Vec<PopulationRecord>,
}

/// One year of population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRecord {
    #[serde(rename = "ID Year")]
    pub year: i32,

    #[serde(rename = "Population")]
    pub population: f64,

    #[serde(rename = "Nation", default, skip_serializing_if = "Option::is_none")]
    pub nation: Option<String>,
}

/// Population mean and spread over a year range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationStats {
    pub start_year: i32,
    pub end_year: i32,
    pub sample_count: usize,
    pub mean: f64,
    /// Sample standard deviation; absent with fewer than two years
    pub std_dev: Option<f64>,
}

/// Year with the largest summed value for one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesBestYear {
    pub series_id: String,
    pub year: i32,
    pub summed_value: f64,
}

/// A BLS observation joined with the population of its year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedRow {
    pub series_id: String,
    pub year: i32,
    pub period: String,
    pub value: f64,
    pub population: f64,
}

/// Everything the analysis step computes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub population: PopulationStats,
    pub best_years: Vec<SeriesBestYear>,
    pub combined: Vec<CombinedRow>,
}
