// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};

use crate::error::{AppError, Result};
use crate::models::{HeaderConfig, HttpConfig};

/// Anything that can GET a URL and hand back the body.
///
/// Non-success statuses are reported as [`AppError::HttpStatus`].
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch the raw body of `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;

    /// Fetch `url` and decode the body as UTF-8 (lossy).
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let bytes = self.fetch(url).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// [`Fetch`] implementation backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a fetcher whose client carries the given headers and timeout.
    pub fn from_config(http: &HttpConfig, headers: &HeaderConfig) -> Result<Self> {
        Ok(Self::new(create_async_client(http, headers)?))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(http: &HttpConfig, headers: &HeaderConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .default_headers(build_header_map(headers)?)
        .timeout(Duration::from_secs(http.timeout_secs))
        .build()?;
    Ok(client)
}

/// Translate the configured headers into a `HeaderMap`.
pub fn build_header_map(headers: &HeaderConfig) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    map.insert(USER_AGENT, header_value("user_agent", &headers.user_agent)?);

    let browser_hints = [
        ("sec-ch-ua", &headers.sec_ch_ua),
        ("sec-ch-ua-mobile", &headers.sec_ch_ua_mobile),
        ("sec-ch-ua-platform", &headers.sec_ch_ua_platform),
    ];
    for (name, value) in browser_hints {
        if let Some(value) = value {
            map.insert(HeaderName::from_static(name), header_value(name, value)?);
        }
    }

    for (name, value) in &headers.extra {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| AppError::config(format!("Invalid header name '{name}': {e}")))?;
        map.insert(header, header_value(name, value)?);
    }

    Ok(map)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::config(format!("Invalid value for header '{name}': {e}")))
}
