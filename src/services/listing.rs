// src/services/listing.rs

//! Remote directory listing collector.
//!
//! The BLS directory pages are IIS-style listings: a single `<pre>` block with
//! one `<br>`-separated line per entry, e.g.
//!
//! ```text
//!  1/3/2025  8:30 AM        10449 <A HREF="/pub/time.series/pr/pr.class">pr.class</A><br>
//! ```

use std::sync::Arc;

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{BlsConfig, RemoteFile, time};
use crate::utils::http::Fetch;
use crate::utils::resolve;
use crate::utils::retry::RetryPolicy;

/// Fetches a directory page and turns it into [`RemoteFile`] records.
pub struct ListingCollector {
    fetcher: Arc<dyn Fetch>,
    base_url: String,
    pattern: Regex,
    retry: RetryPolicy,
}

impl ListingCollector {
    pub fn new(
        fetcher: Arc<dyn Fetch>,
        base_url: impl Into<String>,
        pattern: Regex,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            pattern,
            retry,
        }
    }

    /// Build a collector from the `[bls]` configuration section.
    pub fn from_config(fetcher: Arc<dyn Fetch>, config: &BlsConfig, retry: RetryPolicy) -> Result<Self> {
        Ok(Self::new(
            fetcher,
            config.base_url.clone(),
            config.file_pattern()?,
            retry,
        ))
    }

    /// Fetch and parse the listing at `directory_url`.
    ///
    /// Non-success statuses surface as [`AppError::ListingUnavailable`] (5xx
    /// and 429 are retried first); structural problems as
    /// [`AppError::ListingParse`], never retried.
    pub async fn list_remote_files(&self, directory_url: &str) -> Result<Vec<RemoteFile>> {
        let body = self
            .retry
            .run("list", directory_url, || async {
                self.fetcher
                    .fetch_text(directory_url)
                    .await
                    .map_err(|e| match e {
                        AppError::HttpStatus { url, status } => {
                            AppError::ListingUnavailable { url, status }
                        }
                        other => other,
                    })
            })
            .await?;

        let files = parse_listing(&body, &self.base_url, &self.pattern)?;
        log::info!("Found {} files at {}", files.len(), directory_url);
        Ok(files)
    }
}

/// Parse a directory listing document.
///
/// `pattern` must capture (date, time, size, href, file_name).
///
/// A `<pre>` block in which no row matches is a [`AppError::ListingParse`]
/// rather than an empty listing. An empty result would retire every tracked
/// file, so a change in the page format must stop the run instead.
///
/// File names become storage keys. A name with a path separator, `.`, `..`
/// or an absolute path fails the whole listing with
/// [`AppError::ListingParse`].
pub fn parse_listing(html: &str, base_url: &str, pattern: &Regex) -> Result<Vec<RemoteFile>> {
    let document = Html::parse_document(html);
    let pre_sel =
        Selector::parse("pre").map_err(|e| AppError::listing_parse(format!("{e:?}")))?;
    let block = document
        .select(&pre_sel)
        .next()
        .ok_or_else(|| AppError::listing_parse("directory page has no <pre> block"))?;

    let line_break = Regex::new(r"(?i)<br\s*/?>")?;
    let inner = block.inner_html();

    let mut files = Vec::new();
    for line in line_break.split(&inner) {
        let Some(caps) = pattern.captures(line) else {
            continue;
        };

        let group = |i: usize| caps.get(i).map(|m| m.as_str().trim()).unwrap_or("");
        let (date, clock, href, file_name) = (group(1), group(2), group(4), group(5));
        if file_name.is_empty() || href.is_empty() {
            return Err(AppError::listing_parse(format!(
                "row pattern matched without href/file name: '{}'",
                line.trim()
            )));
        }

        check_file_name(file_name)?;

        let file_timestamp = time::parse_listing(&format!("{date} {clock}")).map_err(|e| {
            AppError::listing_parse(format!(
                "bad timestamp '{date} {clock}' for {file_name}: {e}"
            ))
        })?;

        files.push(RemoteFile {
            file_name: file_name.to_string(),
            file_timestamp,
            full_url: resolve(base_url, href),
        });
    }

    if files.is_empty() {
        return Err(AppError::listing_parse(
            "no line of the <pre> block matched the file pattern",
        ));
    }

    Ok(files)
}

/// A listed name must be a single path component.
fn check_file_name(file_name: &str) -> Result<()> {
    let unsafe_name = matches!(file_name, "." | "..")
        || file_name.contains(['/', '\\'])
        || std::path::Path::new(file_name).is_absolute();
    if unsafe_name {
        return Err(AppError::listing_parse(format!(
            "file name '{file_name}' is not a plain file name"
        )));
    }
    Ok(())
}
