// src/config.rs

//! Configuration loading utilities.
//!
//! The configuration location is a single string, local path or `s3://`
//! URI, read through the same [`Storage`] the run uses.

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::storage::Storage;

/// Environment variable holding the configuration location.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Load and validate the configuration at `location`.
///
/// A missing file, invalid UTF-8, bad TOML or a failed validation are all
/// fatal; nothing falls back to defaults.
pub async fn load_config(storage: &Storage, location: &str) -> Result<Config> {
    log::info!("Loading config from {}", location);

    let bytes = storage
        .read_optional(location)
        .await?
        .ok_or_else(|| AppError::config(format!("Config file not found: {location}")))?;

    let content = String::from_utf8(bytes).map_err(|e| {
        AppError::config(format!("Config file {location} is not valid UTF-8: {e}"))
    })?;

    Config::from_toml_str(&content)
}

/// Configuration location from the environment.
///
/// `CONFIG_PATH` wins over the lowercase `config_path`.
pub fn config_location_from_env() -> Result<String> {
    [CONFIG_PATH_ENV, "config_path"]
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
        .ok_or_else(|| AppError::config(format!("{CONFIG_PATH_ENV} is not set")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VALID: &str = r#"
[bls]
base_url = "https://download.bls.gov"

[bls.scraping]
directory_path = "/pub/time.series/pr/"

[bls.download]
target_directory = "data/bls"
max_workers = 8

[bls.file_tracking]
csv_directory = "data/tracking"
csv_filename = "bls_file_tracker.csv"
"#;

    #[tokio::test]
    async fn test_load_from_storage() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::local(tmp.path());
        storage.write("config/config.toml", VALID.as_bytes()).await.unwrap();

        let config = load_config(&storage, "config/config.toml").await.unwrap();
        assert_eq!(config.bls.download.max_workers, 8);
        assert_eq!(
            config.bls.ledger_location(),
            "data/tracking/bls_file_tracker.csv"
        );
    }

    #[test]
    fn test_bundled_config_is_valid() {
        let config = Config::from_toml_str(include_str!("../data/config.toml")).unwrap();
        assert_eq!(
            config.bls.directory_url(),
            "https://download.bls.gov/pub/time.series/pr/"
        );
        assert!(config.population.is_some());
        assert_eq!(config.analysis.unwrap().metrics.population_end_year, 2018);
    }

    #[tokio::test]
    async fn test_missing_config_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::local(tmp.path());
        assert!(matches!(
            load_config(&storage, "nope.toml").await,
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_values_are_fatal() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::local(tmp.path());
        let invalid = VALID.replace("max_workers = 8", "max_workers = 0");
        storage.write("config.toml", invalid.as_bytes()).await.unwrap();

        assert!(matches!(
            load_config(&storage, "config.toml").await,
            Err(AppError::Validation(_))
        ));
    }
}
