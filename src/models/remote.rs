// src/models/remote.rs

//! Records produced by the directory listing and consumed by the downloader.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::time::listing_time;
use crate::utils::join_location;

/// A file advertised by the remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// File name as shown in the listing
    pub file_name: String,

    /// Modification time as shown in the listing
    #[serde(with = "listing_time")]
    pub file_timestamp: NaiveDateTime,

    /// Absolute URL of the file
    pub full_url: String,
}

/// A single transfer: fetch `url`, store the bytes at `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub url: String,
    pub file_name: String,
    pub destination: String,
}

impl DownloadTask {
    /// Task storing `file_name` under `target_directory`.
    pub fn new(url: impl Into<String>, file_name: impl Into<String>, target_directory: &str) -> Self {
        let file_name = file_name.into();
        Self {
            url: url.into(),
            destination: join_location(target_directory, &file_name),
            file_name,
        }
    }
}
