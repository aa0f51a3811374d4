// src/pipeline/analyze.rs

//! Analysis pipeline over previously downloaded artifacts.

use crate::error::{AppError, Result};
use crate::models::{AnalysisReport, Config};
use crate::services::analysis;
use crate::storage::Storage;

/// Read the BLS and population files and compute the report.
pub async fn run_analysis(config: &Config, storage: &Storage) -> Result<AnalysisReport> {
    let settings = config
        .analysis
        .as_ref()
        .ok_or_else(|| AppError::config("No [analysis] section in configuration"))?;

    let bls_location = settings.bls.location();
    let population_location = settings.population.location();
    log::info!("Analyzing {} against {}", bls_location, population_location);

    let observations = analysis::parse_bls_observations(&storage.read(&bls_location).await?)?;
    let population = analysis::parse_population(&storage.read(&population_location).await?)?;

    analysis::compute_report(&observations, &population, &settings.metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
[bls]
base_url = "https://download.bls.gov"

[bls.scraping]
directory_path = "/pub/time.series/pr/"

[bls.file_tracking]
csv_filename = "bls_file_tracker.csv"

[analysis.bls]
download_dir = "bls"
file_name = "pr.data.0.Current"

[analysis.population]
download_dir = "population"
file_name = "population.json"
"#;

    #[tokio::test]
    async fn test_run_analysis_reads_from_storage() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::local(tmp.path());
        storage
            .write(
                "bls/pr.data.0.Current",
                b"series_id        \tyear\tperiod\t       value\tfootnote_codes\n\
PRS30006032      \t2018\tQ01\t        1.9\t\n\
PRS30006032      \t2019\tQ01\t       -0.1\t\n",
            )
            .await
            .unwrap();
        storage
            .write(
                "population/population.json",
                br#"{"data":[{"ID Year":2018,"Population":327167439},{"ID Year":2017,"Population":325719178}]}"#,
            )
            .await
            .unwrap();

        let config = Config::from_toml_str(CONFIG).unwrap();
        let report = run_analysis(&config, &storage).await.unwrap();

        assert_eq!(report.population.sample_count, 2);
        assert_eq!(report.best_years[0].year, 2018);
        assert_eq!(report.combined.len(), 1);
        assert_eq!(report.combined[0].population, 327167439.0);
    }

    #[tokio::test]
    async fn test_missing_analysis_section() {
        let tmp = TempDir::new().unwrap();
        let config = Config::from_toml_str(
            r#"
[bls]
base_url = "https://download.bls.gov"
[bls.scraping]
directory_path = "/pub/time.series/pr/"
[bls.file_tracking]
csv_filename = "ledger.csv"
"#,
        )
        .unwrap();

        assert!(matches!(
            run_analysis(&config, &Storage::local(tmp.path())).await,
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_input_file() {
        let tmp = TempDir::new().unwrap();
        let config = Config::from_toml_str(CONFIG).unwrap();
        assert!(run_analysis(&config, &Storage::local(tmp.path())).await.is_err());
    }
}
