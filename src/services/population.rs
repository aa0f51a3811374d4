// src/services/population.rs

//! Population API fetcher.

use std::sync::Arc;

use crate::error::Result;
use crate::models::PopulationConfig;
use crate::storage::Storage;
use crate::utils::http::Fetch;
use crate::utils::retry::RetryPolicy;

/// Fetches the population document and stores it pretty-printed.
pub struct PopulationFetcher {
    fetcher: Arc<dyn Fetch>,
    storage: Storage,
    retry: RetryPolicy,
}

impl PopulationFetcher {
    pub fn new(fetcher: Arc<dyn Fetch>, storage: Storage, retry: RetryPolicy) -> Self {
        Self {
            fetcher,
            storage,
            retry,
        }
    }

    /// Fetch `config.base_url` and write it to the configured location.
    ///
    /// Returns the location written. A body that is not JSON fails the step
    /// without writing anything.
    pub async fn fetch_and_store(&self, config: &PopulationConfig) -> Result<String> {
        let body = self
            .retry
            .run("population", &config.base_url, || {
                self.fetcher.fetch(&config.base_url)
            })
            .await?;

        let document: serde_json::Value = serde_json::from_slice(&body)?;
        let pretty = serde_json::to_vec_pretty(&document)?;

        let location = config.output_location();
        self.storage.write(&location, &pretty).await?;
        log::info!("Saved population data to {}", location);
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{HeaderConfig, PopulationDownloadConfig};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct Body(&'static str);

    #[async_trait]
    impl Fetch for Body {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    fn config() -> PopulationConfig {
        PopulationConfig {
            base_url: "https://datausa.io/api/data?drilldowns=Nation&measures=Population".into(),
            headers: HeaderConfig::default(),
            download: PopulationDownloadConfig {
                json_directory: "population".into(),
                json_filename: "population.json".into(),
            },
        }
    }

    #[tokio::test]
    async fn test_population_is_pretty_printed() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::local(tmp.path());
        let fetcher = PopulationFetcher::new(
            Arc::new(Body(r#"{"data":[{"ID Year":2019,"Population":328239523}]}"#)),
            storage.clone(),
            RetryPolicy::immediate(1),
        );

        let location = fetcher.fetch_and_store(&config()).await.unwrap();
        assert_eq!(location, "population/population.json");

        let written = String::from_utf8(storage.read(&location).await.unwrap()).unwrap();
        assert!(written.contains("\n  \"data\""));
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["data"][0]["ID Year"], 2019);
    }

    #[tokio::test]
    async fn test_non_json_body_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::local(tmp.path());
        let fetcher = PopulationFetcher::new(
            Arc::new(Body("<html>rate limited</html>")),
            storage.clone(),
            RetryPolicy::immediate(1),
        );

        let err = fetcher.fetch_and_store(&config()).await.unwrap_err();
        assert!(matches!(err, AppError::Json(_)));
        assert!(!storage.exists("population/population.json").await.unwrap());
    }
}
