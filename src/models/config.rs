//! Application configuration structures.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::join_location;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client and retry settings
    #[serde(default)]
    pub http: HttpConfig,

    /// BLS directory tracking and download
    pub bls: BlsConfig,

    /// Population document download (skipped when absent)
    #[serde(default)]
    pub population: Option<PopulationConfig>,

    /// Inputs and parameters of the analysis run
    #[serde(default)]
    pub analysis: Option<AnalysisConfig>,
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        self.http.validate()?;
        self.bls.validate()?;
        if let Some(population) = &self.population {
            population.validate()?;
        }
        if let Some(analysis) = &self.analysis {
            analysis.validate()?;
        }
        Ok(())
    }
}

/// HTTP client and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Attempts per request, including the first
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: usize,

    /// First backoff delay in milliseconds
    #[serde(default = "defaults::backoff_min_ms")]
    pub backoff_min_ms: u64,

    /// Largest backoff delay in milliseconds
    #[serde(default = "defaults::backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::timeout(),
            max_attempts: defaults::max_attempts(),
            backoff_min_ms: defaults::backoff_min_ms(),
            backoff_max_ms: defaults::backoff_max_ms(),
        }
    }
}

impl HttpConfig {
    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.max_attempts == 0 {
            return Err(AppError::validation("http.max_attempts must be >= 1"));
        }
        Ok(())
    }
}

/// Request headers sent to a data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderConfig {
    /// User-Agent header; BLS rejects anonymous agents
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub sec_ch_ua: Option<String>,

    #[serde(default)]
    pub sec_ch_ua_mobile: Option<String>,

    #[serde(default)]
    pub sec_ch_ua_platform: Option<String>,

    /// Any further headers, sent verbatim
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            sec_ch_ua: None,
            sec_ch_ua_mobile: None,
            sec_ch_ua_platform: None,
            extra: BTreeMap::new(),
        }
    }
}

/// BLS directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlsConfig {
    /// Scheme and host, e.g. `https://download.bls.gov`
    pub base_url: String,

    #[serde(default)]
    pub headers: HeaderConfig,

    pub scraping: ScrapingConfig,

    #[serde(default)]
    pub download: DownloadConfig,

    pub file_tracking: FileTrackingConfig,
}

impl BlsConfig {
    /// Full URL of the directory listing page.
    pub fn directory_url(&self) -> String {
        let path = self.scraping.directory_path.trim();
        if path.starts_with('/') {
            format!("{}{}", self.base_url.trim_end_matches('/'), path)
        } else {
            format!("{}/{}", self.base_url.trim_end_matches('/'), path)
        }
    }

    /// Location of the ledger file.
    pub fn ledger_location(&self) -> String {
        join_location(
            &self.file_tracking.csv_directory,
            &self.file_tracking.csv_filename,
        )
    }

    /// Compile the listing row pattern.
    pub fn file_pattern(&self) -> Result<Regex> {
        let pattern = Regex::new(&self.scraping.file_regex_pattern)?;
        // captures_len counts the implicit whole-match group
        if pattern.captures_len() != 6 {
            return Err(AppError::validation(format!(
                "bls.scraping.file_regex_pattern must have 5 capture groups (date, time, size, href, file_name), found {}",
                pattern.captures_len() - 1
            )));
        }
        Ok(pattern)
    }

    fn validate(&self) -> Result<()> {
        validate_base_url("bls.base_url", &self.base_url)?;
        if self.scraping.directory_path.trim().is_empty() {
            return Err(AppError::validation("bls.scraping.directory_path is empty"));
        }
        self.file_pattern()?;
        if self.download.max_workers == 0 {
            return Err(AppError::validation(
                "bls.download.max_workers must be at least 1",
            ));
        }
        if self.file_tracking.csv_filename.trim().is_empty() {
            return Err(AppError::validation(
                "bls.file_tracking.csv_filename is empty",
            ));
        }
        Ok(())
    }
}

/// Directory listing scraping rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingConfig {
    /// Path of the listing page relative to `base_url`
    pub directory_path: String,

    /// Row pattern capturing (date, time, size, href, file_name)
    #[serde(default = "defaults::file_regex_pattern")]
    pub file_regex_pattern: String,
}

/// Download destination and parallelism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Local directory or `s3://bucket/prefix`
    #[serde(default)]
    pub target_directory: String,

    /// Concurrent transfers
    #[serde(default = "defaults::max_workers")]
    pub max_workers: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            target_directory: String::new(),
            max_workers: defaults::max_workers(),
        }
    }
}

/// Ledger location and listing policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTrackingConfig {
    #[serde(default)]
    pub csv_directory: String,

    pub csv_filename: String,

    /// What to do when a listing names the same file twice
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

/// Handling of repeated file names within one listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the first occurrence
    #[default]
    KeepFirst,
    /// Keep the last occurrence
    KeepLast,
    /// Fail the run
    Reject,
}

/// Population API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Full API URL including the query string
    pub base_url: String,

    #[serde(default)]
    pub headers: HeaderConfig,

    pub download: PopulationDownloadConfig,
}

impl PopulationConfig {
    /// Location the population document is written to.
    pub fn output_location(&self) -> String {
        join_location(&self.download.json_directory, &self.download.json_filename)
    }

    fn validate(&self) -> Result<()> {
        validate_base_url("population.base_url", &self.base_url)?;
        if self.download.json_filename.trim().is_empty() {
            return Err(AppError::validation(
                "population.download.json_filename is empty",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationDownloadConfig {
    #[serde(default)]
    pub json_directory: String,
    pub json_filename: String,
}

/// Analysis inputs and parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Tab-delimited BLS current-data file
    pub bls: AnalysisSource,

    /// Population JSON document
    pub population: AnalysisSource,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AnalysisConfig {
    fn validate(&self) -> Result<()> {
        if self.bls.file_name.trim().is_empty() {
            return Err(AppError::validation("analysis.bls.file_name is empty"));
        }
        if self.population.file_name.trim().is_empty() {
            return Err(AppError::validation(
                "analysis.population.file_name is empty",
            ));
        }
        if self.metrics.population_start_year > self.metrics.population_end_year {
            return Err(AppError::validation(
                "analysis.metrics.population_start_year must not exceed population_end_year",
            ));
        }
        Ok(())
    }
}

/// A previously downloaded artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSource {
    #[serde(default)]
    pub download_dir: String,
    pub file_name: String,
}

impl AnalysisSource {
    pub fn location(&self) -> String {
        join_location(&self.download_dir, &self.file_name)
    }
}

/// Parameters of the computed metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "defaults::population_start_year")]
    pub population_start_year: i32,

    #[serde(default = "defaults::population_end_year")]
    pub population_end_year: i32,

    /// Series joined against population
    #[serde(default = "defaults::join_series_id")]
    pub join_series_id: String,

    #[serde(default = "defaults::join_period")]
    pub join_period: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            population_start_year: defaults::population_start_year(),
            population_end_year: defaults::population_end_year(),
            join_series_id: defaults::join_series_id(),
            join_period: defaults::join_period(),
        }
    }
}

fn validate_base_url(field: &str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "{field} must start with http:// or https://, got '{value}'"
        )))
    }
}

mod defaults {
    // HTTP defaults
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_attempts() -> usize {
        3
    }
    pub fn backoff_min_ms() -> u64 {
        2_000
    }
    pub fn backoff_max_ms() -> u64 {
        30_000
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; bls-ingest/0.1)".into()
    }

    // Scraping defaults
    pub fn file_regex_pattern() -> String {
        r#"(?i)(\d{1,2}/\d{1,2}/\d{4})\s+(\d{1,2}:\d{2}\s*[AP]M)\s+(\d+)\s+<a href="([^"]+)">([^<]+)</a>"#
            .into()
    }
    pub fn max_workers() -> usize {
        4
    }

    // Metrics defaults
    pub fn population_start_year() -> i32 {
        2013
    }
    pub fn population_end_year() -> i32 {
        2018
    }
    pub fn join_series_id() -> String {
        "PRS30006032".into()
    }
    pub fn join_period() -> String {
        "Q01".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[http]
timeout_secs = 10

[bls]
base_url = "https://download.bls.gov"

[bls.headers]
user_agent = "ingest-bot/1.0 (ops@example.com)"
sec_ch_ua_mobile = "?0"

[bls.scraping]
directory_path = "/pub/time.series/pr/"

[bls.download]
target_directory = "data/bls"
max_workers = 3

[bls.file_tracking]
csv_directory = "data/tracking"
csv_filename = "bls_file_tracker.csv"

[population]
base_url = "https://datausa.io/api/data?drilldowns=Nation&measures=Population"

[population.download]
json_directory = "data/population"
json_filename = "population.json"

[analysis.bls]
download_dir = "data/bls"
file_name = "pr.data.0.Current"

[analysis.population]
download_dir = "data/population"
file_name = "population.json"
"#;

    #[test]
    fn parse_sample_config() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.http.max_attempts, 3);
        assert_eq!(
            config.bls.directory_url(),
            "https://download.bls.gov/pub/time.series/pr/"
        );
        assert_eq!(
            config.bls.ledger_location(),
            "data/tracking/bls_file_tracker.csv"
        );
        assert_eq!(config.bls.download.max_workers, 3);
        assert_eq!(
            config.bls.file_tracking.duplicate_policy,
            DuplicatePolicy::KeepFirst
        );
        let population = config.population.unwrap();
        assert_eq!(population.output_location(), "data/population/population.json");
        let analysis = config.analysis.unwrap();
        assert_eq!(analysis.metrics.join_series_id, "PRS30006032");
        assert_eq!(analysis.bls.location(), "data/bls/pr.data.0.Current");
    }

    #[test]
    fn validate_rejects_non_http_base_url() {
        let bad = SAMPLE.replace(
            "base_url = \"https://download.bls.gov\"",
            "base_url = \"ftp://download.bls.gov\"",
        );
        assert!(matches!(
            Config::from_toml_str(&bad),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let bad = SAMPLE.replace("max_workers = 3", "max_workers = 0");
        let err = Config::from_toml_str(&bad).unwrap_err();
        assert!(err.to_string().contains("max_workers"));
    }

    #[test]
    fn validate_rejects_pattern_with_wrong_group_count() {
        let bad = SAMPLE.replace(
            "directory_path = \"/pub/time.series/pr/\"",
            "directory_path = \"/pub/time.series/pr/\"\nfile_regex_pattern = '(\\d+) (\\S+)'",
        );
        let err = Config::from_toml_str(&bad).unwrap_err();
        assert!(err.to_string().contains("5 capture groups"));
    }

    #[test]
    fn validate_rejects_missing_section() {
        let bad = SAMPLE.replace("[bls.file_tracking]", "[bls.tracking]");
        assert!(matches!(
            Config::from_toml_str(&bad),
            Err(AppError::Toml(_))
        ));
    }

    #[test]
    fn duplicate_policy_parses_snake_case() {
        let with_policy = SAMPLE.replace(
            "csv_filename = \"bls_file_tracker.csv\"",
            "csv_filename = \"bls_file_tracker.csv\"\nduplicate_policy = \"keep_last\"",
        );
        let config = Config::from_toml_str(&with_policy).unwrap();
        assert_eq!(
            config.bls.file_tracking.duplicate_policy,
            DuplicatePolicy::KeepLast
        );
    }

    #[test]
    fn directory_url_without_leading_slash() {
        let mut config = Config::from_toml_str(SAMPLE).unwrap();
        config.bls.base_url = "https://download.bls.gov/".into();
        config.bls.scraping.directory_path = "pub/time.series/pr/".into();
        assert_eq!(
            config.bls.directory_url(),
            "https://download.bls.gov/pub/time.series/pr/"
        );
    }
}
