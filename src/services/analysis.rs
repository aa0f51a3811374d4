// src/services/analysis.rs

//! Descriptive metrics over the downloaded BLS and population files.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{
    AnalysisReport, BlsObservation, CombinedRow, MetricsConfig, PopulationDocument,
    PopulationRecord, PopulationStats, SeriesBestYear,
};

#[derive(Deserialize)]
struct RawObservation {
    series_id: String,
    year: String,
    period: String,
    value: String,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Parse the tab-delimited BLS current-data file.
///
/// Header names and fields are whitespace padded; extra columns such as
/// `footnote_codes` are ignored.
pub fn parse_bls_observations(bytes: &[u8]) -> Result<Vec<BlsObservation>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let mut observations = Vec::new();
    for (i, row) in reader.deserialize::<RawObservation>().enumerate() {
        let raw = row?;
        let line = i + 2;
        let year = raw.year.parse::<i32>().map_err(|e| {
            AppError::analysis(format!("line {line}: bad year '{}': {e}", raw.year))
        })?;
        let value = raw.value.parse::<f64>().map_err(|e| {
            AppError::analysis(format!("line {line}: bad value '{}': {e}", raw.value))
        })?;

        observations.push(BlsObservation {
            series_id: raw.series_id,
            year,
            period: raw.period,
            value: round3(value),
        });
    }

    log::info!("Loaded {} BLS observations", observations.len());
    Ok(observations)
}

/// Parse the population JSON document.
pub fn parse_population(bytes: &[u8]) -> Result<Vec<PopulationRecord>> {
    let document: PopulationDocument = serde_json::from_slice(bytes)?;
    log::info!("Loaded {} population records", document.data.len());
    Ok(document.data)
}

/// Mean and sample standard deviation of population over `[start_year, end_year]`.
pub fn population_stats(
    records: &[PopulationRecord],
    start_year: i32,
    end_year: i32,
) -> Result<PopulationStats> {
    let values: Vec<f64> = records
        .iter()
        .filter(|r| (start_year..=end_year).contains(&r.year))
        .map(|r| r.population)
        .collect();

    if values.is_empty() {
        return Err(AppError::analysis(format!(
            "no population data between {start_year} and {end_year}"
        )));
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std_dev = (values.len() > 1).then(|| {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    });

    Ok(PopulationStats {
        start_year,
        end_year,
        sample_count: values.len(),
        mean,
        std_dev,
    })
}

/// For each series, the year whose summed value is largest.
///
/// Ties go to the earliest year. Output is ordered by series id.
pub fn best_year_by_series(observations: &[BlsObservation]) -> Vec<SeriesBestYear> {
    let mut sums: BTreeMap<&str, BTreeMap<i32, f64>> = BTreeMap::new();
    for obs in observations {
        *sums
            .entry(obs.series_id.as_str())
            .or_default()
            .entry(obs.year)
            .or_insert(0.0) += obs.value;
    }

    sums.into_iter()
        .filter_map(|(series_id, years)| {
            // Strict comparison keeps the earliest year on ties
            let mut best: Option<(i32, f64)> = None;
            for (year, sum) in years {
                if best.is_none_or(|(_, top)| sum > top) {
                    best = Some((year, sum));
                }
            }
            best.map(|(year, sum)| SeriesBestYear {
                series_id: series_id.to_string(),
                year,
                summed_value: round3(sum),
            })
        })
        .collect()
}

/// Rows of one series/period joined with the population of their year.
///
/// Rows whose year has no population are dropped; output is sorted by year.
pub fn join_with_population(
    observations: &[BlsObservation],
    population: &[PopulationRecord],
    series_id: &str,
    period: &str,
) -> Vec<CombinedRow> {
    let by_year: HashMap<i32, f64> = population.iter().map(|r| (r.year, r.population)).collect();

    let mut rows: Vec<CombinedRow> = observations
        .iter()
        .filter(|o| o.series_id == series_id && o.period == period)
        .filter_map(|o| {
            by_year.get(&o.year).map(|population| CombinedRow {
                series_id: o.series_id.clone(),
                year: o.year,
                period: o.period.clone(),
                value: o.value,
                population: *population,
            })
        })
        .collect();

    rows.sort_by_key(|r| r.year);
    rows
}

/// Compute every metric of the analysis report.
pub fn compute_report(
    observations: &[BlsObservation],
    population: &[PopulationRecord],
    metrics: &MetricsConfig,
) -> Result<AnalysisReport> {
    let stats = population_stats(
        population,
        metrics.population_start_year,
        metrics.population_end_year,
    )?;
    log::info!(
        "Mean Population ({}-{}): {}",
        stats.start_year,
        stats.end_year,
        stats.mean
    );
    match stats.std_dev {
        Some(std_dev) => log::info!(
            "Standard Deviation of Population ({}-{}): {}",
            stats.start_year,
            stats.end_year,
            std_dev
        ),
        None => log::warn!("Only one population year in range; no standard deviation"),
    }

    let best_years = best_year_by_series(observations);
    log::info!("Computed best year for {} series", best_years.len());

    let combined = join_with_population(
        observations,
        population,
        &metrics.join_series_id,
        &metrics.join_period,
    );
    log::info!(
        "Joined {} {} rows of {} with population",
        combined.len(),
        metrics.join_period,
        metrics.join_series_id
    );

    Ok(AnalysisReport {
        population: stats,
        best_years,
        combined,
    })
}
