// src/services/downloader.rs

//! Bounded-concurrency bulk downloader.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::models::DownloadTask;
use crate::storage::Storage;
use crate::utils::http::Fetch;
use crate::utils::retry::RetryPolicy;

/// Result of one transfer.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub task: DownloadTask,
    /// Bytes written on success
    pub result: Result<u64>,
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Downloads many files in parallel and stores each one.
///
/// A failed transfer never aborts the others; every task gets an outcome.
pub struct BulkDownloader {
    fetcher: Arc<dyn Fetch>,
    storage: Storage,
    retry: RetryPolicy,
}

impl BulkDownloader {
    pub fn new(fetcher: Arc<dyn Fetch>, storage: Storage, retry: RetryPolicy) -> Self {
        Self {
            fetcher,
            storage,
            retry,
        }
    }

    /// Fetch one file and store it at its destination.
    pub async fn download(&self, task: &DownloadTask) -> Result<u64> {
        let bytes = self
            .retry
            .run("download", &task.url, || self.fetcher.fetch(&task.url))
            .await?;
        self.storage
            .write(&task.destination, &bytes)
            .await
            .map_err(|e| {
                AppError::download(&task.url, format!("storing at {}: {e}", task.destination))
            })?;
        Ok(bytes.len() as u64)
    }

    /// Run all tasks with at most `max_concurrency` transfers in flight.
    ///
    /// Outcomes come back in completion order.
    pub async fn download_all(
        &self,
        tasks: Vec<DownloadTask>,
        max_concurrency: usize,
    ) -> Vec<DownloadOutcome> {
        if tasks.is_empty() {
            return Vec::new();
        }

        let total = tasks.len();
        log::info!(
            "Downloading {} files with {} workers",
            total,
            max_concurrency.max(1)
        );

        let outcomes: Vec<DownloadOutcome> = stream::iter(tasks)
            .map(|task| async move {
                let result = self.download(&task).await;
                match &result {
                    Ok(size) => log::info!("Uploaded: {} ({} bytes)", task.destination, size),
                    Err(e) => log::error!("Error downloading {}: {}", task.url, e),
                }
                DownloadOutcome { task, result }
            })
            .buffer_unordered(max_concurrency.max(1))
            .collect()
            .await;

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        log::info!(
            "Downloads complete: {} succeeded, {} failed",
            total - failed,
            failed
        );
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Serves `content:<url>` for every URL except those containing "broken".
    struct FakeFetcher {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeFetcher {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetch for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if url.contains("broken") {
                Err(AppError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                })
            } else {
                Ok(format!("content:{url}").into_bytes())
            }
        }
    }

    fn tasks(names: &[&str]) -> Vec<DownloadTask> {
        names
            .iter()
            .map(|n| DownloadTask::new(format!("https://host/pub/{n}"), *n, "bls"))
            .collect()
    }

    #[tokio::test]
    async fn test_downloads_are_stored() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::local(tmp.path()).with_retry(RetryPolicy::immediate(1));
        let downloader = BulkDownloader::new(
            Arc::new(FakeFetcher::new()),
            storage.clone(),
            RetryPolicy::immediate(2),
        );

        let outcomes = downloader
            .download_all(tasks(&["pr.class", "pr.series"]), 2)
            .await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(DownloadOutcome::is_success));
        assert_eq!(
            storage.read("bls/pr.class").await.unwrap(),
            b"content:https://host/pub/pr.class"
        );
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_rest() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::local(tmp.path());
        let downloader = BulkDownloader::new(
            Arc::new(FakeFetcher::new()),
            storage.clone(),
            RetryPolicy::immediate(2),
        );

        let outcomes = downloader
            .download_all(tasks(&["a.txt", "broken.txt", "c.txt"]), 3)
            .await;

        assert_eq!(outcomes.len(), 3);
        let failed: Vec<_> = outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.task.file_name.as_str())
            .collect();
        assert_eq!(failed, vec!["broken.txt"]);
        assert!(storage.exists("bls/a.txt").await.unwrap());
        assert!(storage.exists("bls/c.txt").await.unwrap());
        assert!(!storage.exists("bls/broken.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let tmp = TempDir::new().unwrap();
        let fetcher = Arc::new(FakeFetcher::new());
        let downloader = BulkDownloader::new(
            fetcher.clone(),
            Storage::local(tmp.path()),
            RetryPolicy::immediate(1),
        );

        let names: Vec<String> = (0..10).map(|i| format!("f{i}.txt")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let outcomes = downloader.download_all(tasks(&refs), 3).await;

        assert_eq!(outcomes.len(), 10);
        assert!(fetcher.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_empty_task_list() {
        let tmp = TempDir::new().unwrap();
        let downloader = BulkDownloader::new(
            Arc::new(FakeFetcher::new()),
            Storage::local(tmp.path()),
            RetryPolicy::immediate(1),
        );
        assert!(downloader.download_all(Vec::new(), 4).await.is_empty());
    }
}
