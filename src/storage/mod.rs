//! Storage abstractions for ledgers and downloaded artifacts.
//!
//! Every location is a plain string. `s3://bucket/key` resolves to the S3
//! backend (feature `s3`); anything else is a path on the local filesystem.
//!
//! ```text
//! data/tracking/bls_file_tracker.csv     -> LocalStorage
//! s3://my-bucket/bls/pr.data.0.Current   -> S3Storage (bucket = my-bucket)
//! ```

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use std::fmt;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::utils::retry::RetryPolicy;

// Re-export for convenience
pub use local::LocalStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;

/// A single storage backend addressed by backend-relative keys.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Whether an object exists at `key`.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Read the object at `key`, `None` if absent.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the object at `key` with `bytes`.
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Delete the object at `key`; returns `false` when nothing was there.
    async fn delete(&self, key: &str) -> Result<bool>;
}

/// A parsed location string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(String),
    S3 { bucket: String, key: String },
}

impl Location {
    /// Parse a location string, selecting the backend by scheme.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AppError::config("Empty storage location"));
        }

        match raw.strip_prefix("s3://") {
            Some(rest) => {
                let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
                let key = key.trim_start_matches('/');
                if bucket.is_empty() || key.is_empty() {
                    return Err(AppError::config(format!(
                        "S3 location must look like s3://bucket/key, got '{raw}'"
                    )));
                }
                Ok(Self::S3 {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            None => Ok(Self::Local(raw.to_string())),
        }
    }

    /// Backend-relative key.
    pub fn key(&self) -> &str {
        match self {
            Self::Local(path) => path,
            Self::S3 { key, .. } => key,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{path}"),
            Self::S3 { bucket, key } => write!(f, "s3://{bucket}/{key}"),
        }
    }
}

/// Scheme-routing storage handle.
///
/// Constructed once per run and passed to every component that touches
/// storage. Transient backend errors are retried with the configured policy.
#[derive(Clone)]
pub struct Storage {
    local: LocalStorage,
    #[cfg(feature = "s3")]
    s3_client: Option<aws_sdk_s3::Client>,
    retry: RetryPolicy,
}

impl Storage {
    /// Storage resolving relative local paths against `root_dir`.
    pub fn local(root_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            local: LocalStorage::new(root_dir),
            #[cfg(feature = "s3")]
            s3_client: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Enable `s3://` locations.
    #[cfg(feature = "s3")]
    pub fn with_s3(mut self, client: aws_sdk_s3::Client) -> Self {
        self.s3_client = Some(client);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn backend(&self, location: &Location) -> Result<Box<dyn StorageBackend>> {
        match location {
            Location::Local(_) => Ok(Box::new(self.local.clone())),
            #[cfg(feature = "s3")]
            Location::S3 { bucket, .. } => match &self.s3_client {
                Some(client) => Ok(Box::new(S3Storage::new(client.clone(), bucket.clone()))),
                None => Err(AppError::config(format!(
                    "No S3 client configured for {location}"
                ))),
            },
            #[cfg(not(feature = "s3"))]
            Location::S3 { .. } => Err(AppError::config(format!(
                "{location} requires the 's3' feature"
            ))),
        }
    }

    /// Whether anything exists at `path`.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        let location = Location::parse(path)?;
        let backend = self.backend(&location)?;
        self.retry
            .run("exists", path, || backend.exists(location.key()))
            .await
    }

    /// Read `path`, `None` if it does not exist.
    pub async fn read_optional(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let location = Location::parse(path)?;
        let backend = self.backend(&location)?;
        self.retry
            .run("read", path, || backend.read_bytes(location.key()))
            .await
    }

    /// Read `path`, failing if it does not exist.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.read_optional(path).await?.ok_or_else(|| {
            AppError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{path} not found"),
            ))
        })
    }

    /// Replace whatever is at `path` with `bytes`.
    pub async fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let location = Location::parse(path)?;
        let backend = self.backend(&location)?;
        self.retry
            .run("write", path, || backend.write_bytes(location.key(), bytes))
            .await?;
        log::debug!("Wrote {} bytes to {}", bytes.len(), location);
        Ok(())
    }

    /// Delete `path`. Missing paths are not an error.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let location = Location::parse(path)?;
        let backend = self.backend(&location)?;
        let existed = self
            .retry
            .run("delete", path, || backend.delete(location.key()))
            .await?;
        if existed {
            log::debug!("Deleted: {}", location);
        } else {
            log::debug!("File not found: {}", location);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_local() {
        assert_eq!(
            Location::parse("data/tracking/ledger.csv").unwrap(),
            Location::Local("data/tracking/ledger.csv".into())
        );
    }

    #[test]
    fn test_parse_s3() {
        let location = Location::parse("s3://bucket/bls/pr.class").unwrap();
        assert_eq!(
            location,
            Location::S3 {
                bucket: "bucket".into(),
                key: "bls/pr.class".into()
            }
        );
        assert_eq!(location.to_string(), "s3://bucket/bls/pr.class");
    }

    #[test]
    fn test_parse_rejects_bucket_only() {
        assert!(Location::parse("s3://bucket").is_err());
        assert!(Location::parse("s3:///key").is_err());
        assert!(Location::parse("  ").is_err());
    }

    #[cfg(not(feature = "s3"))]
    #[tokio::test]
    async fn test_s3_without_feature_is_config_error() {
        let storage = Storage::local(".");
        assert!(matches!(
            storage.exists("s3://bucket/key").await,
            Err(AppError::Config(_))
        ));
    }

    #[cfg(feature = "s3")]
    #[tokio::test]
    async fn test_s3_without_client_is_config_error() {
        let storage = Storage::local(".");
        assert!(matches!(
            storage.exists("s3://bucket/key").await,
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_router_local_lifecycle() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::local(tmp.path()).with_retry(RetryPolicy::immediate(2));

        assert!(!storage.exists("bls/pr.class").await.unwrap());
        storage.write("bls/pr.class", b"series").await.unwrap();
        assert!(storage.exists("bls/pr.class").await.unwrap());
        assert_eq!(storage.read("bls/pr.class").await.unwrap(), b"series");

        storage.delete("bls/pr.class").await.unwrap();
        assert!(storage.read_optional("bls/pr.class").await.unwrap().is_none());

        // Deleting twice is a no-op
        storage.delete("bls/pr.class").await.unwrap();
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::local(tmp.path()).with_retry(RetryPolicy::immediate(3));

        match storage.read("nope.csv").await {
            Err(AppError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
