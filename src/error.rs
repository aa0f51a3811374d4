// src/error.rs

//! Unified error handling for ingestion and analysis runs.

use std::fmt;

use thiserror::Error;

/// Result type alias for ingest operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// AWS S3 error
    #[error("S3 error: {0}")]
    S3(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP request completed with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reading/writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Regular expression failed to compile
    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Directory listing could not be fetched
    #[error("Listing unavailable at {url}: HTTP {status}")]
    ListingUnavailable { url: String, status: u16 },

    /// Directory listing did not have the expected structure
    #[error("Listing parse error: {0}")]
    ListingParse(String),

    /// Persisted ledger is missing columns or violates its invariants
    #[error("Malformed ledger: {0}")]
    MalformedLedger(String),

    /// The same file name appeared twice in one listing
    #[error("Duplicate listing entry for '{0}'")]
    DuplicateListingEntry(String),

    /// A single file transfer failed
    #[error("Download of {url} failed: {message}")]
    Download { url: String, message: String },

    /// Analysis inputs were unusable
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// A retried operation ran out of attempts
    #[error("{operation} on {target} failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        operation: String,
        target: String,
        attempts: usize,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a listing parse error.
    pub fn listing_parse(message: impl Into<String>) -> Self {
        Self::ListingParse(message.into())
    }

    /// Create a malformed ledger error.
    pub fn malformed_ledger(message: impl Into<String>) -> Self {
        Self::MalformedLedger(message.into())
    }

    /// Create an analysis error.
    pub fn analysis(message: impl Into<String>) -> Self {
        Self::Analysis(message.into())
    }

    /// Create a download error with the failing URL.
    pub fn download(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Download {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Whether retrying the failed operation could succeed.
    ///
    /// Network failures, timeouts, 5xx and 429 responses, S3 errors and most
    /// local I/O errors are transient. Parse, configuration and ledger errors
    /// are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => {
                if let Some(status) = e.status() {
                    is_retryable_status(status.as_u16())
                } else {
                    e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
                }
            }
            Self::HttpStatus { status, .. } | Self::ListingUnavailable { status, .. } => {
                is_retryable_status(*status)
            }
            Self::S3(_) => true,
            Self::Io(e) => !matches!(
                e.kind(),
                std::io::ErrorKind::NotFound
                    | std::io::ErrorKind::PermissionDenied
                    | std::io::ErrorKind::InvalidInput
                    | std::io::ErrorKind::InvalidData
            ),
            _ => false,
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_transient() {
        let err = AppError::HttpStatus {
            url: "https://example.com".into(),
            status: 503,
        };
        assert!(err.is_transient());

        let throttled = AppError::ListingUnavailable {
            url: "https://example.com".into(),
            status: 429,
        };
        assert!(throttled.is_transient());
    }

    #[test]
    fn test_client_errors_are_not_transient() {
        let err = AppError::HttpStatus {
            url: "https://example.com".into(),
            status: 404,
        };
        assert!(!err.is_transient());
        assert!(!AppError::listing_parse("no <pre>").is_transient());
        assert!(!AppError::malformed_ledger("missing column").is_transient());
    }

    #[test]
    fn test_io_not_found_is_not_transient() {
        let err = AppError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(!err.is_transient());

        let err = AppError::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow"));
        assert!(err.is_transient());
    }

    #[test]
    fn test_exhausted_message_carries_context() {
        let err = AppError::RetriesExhausted {
            operation: "read".into(),
            target: "s3://bucket/ledger.csv".into(),
            attempts: 3,
            source: Box::new(AppError::S3("throttled".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("read on s3://bucket/ledger.csv"));
        assert!(msg.contains("3 attempt(s)"));
    }
}
