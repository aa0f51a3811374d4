//! AWS S3 storage implementation.
//!
//! One `S3Storage` addresses a single bucket; the router builds one per
//! `s3://bucket/...` location from a shared client.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::{AppError, Result};
use crate::storage::StorageBackend;

/// S3-based storage for a single bucket.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3 storage instance.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build an S3 client from the ambient AWS environment.
    pub async fn client_from_env() -> Client {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Client::new(&config)
    }

    fn uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    /// Check if an object exists in S3.
    async fn exists(&self, key: &str) -> Result<bool> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(AppError::S3(format!("{}: {}", self.uri(key), service_err)))
                }
            }
        }
    }

    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| AppError::S3(format!("{}: {}", self.uri(key), e)))?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(err) => {
                // Check if it's a "not found" error
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    log::debug!("No existing object at {}", self.uri(key));
                    Ok(None)
                } else {
                    Err(AppError::S3(format!("{}: {}", self.uri(key), service_err)))
                }
            }
        }
    }

    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(|e| AppError::S3(format!("{}: {}", self.uri(key), e.into_service_error())))?;
        Ok(())
    }

    /// Delete an object; S3 itself does not report missing keys, so probe first.
    async fn delete(&self, key: &str) -> Result<bool> {
        if !self.exists(key).await? {
            return Ok(false);
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("{}: {}", self.uri(key), e.into_service_error())))?;

        Ok(true)
    }
}
