//! Page retrieval behind the extractor.
//!
//! [`PageSource`] is the seam between network access and HTML parsing:
//! [`HttpSource`] performs real requests, tests plug in static pages.

use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{AppError, Result};
use crate::extractor::ExtractorConfig;

/// A fetched page: the URL after redirects plus the decoded body.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub final_url: Url,
    pub html: String,
}

/// Anything that can turn a URL into HTML.
pub trait PageSource {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage>;
}

/// [`PageSource`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    /// Build a client that identifies as the configured browser.
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.browser_user_agent)
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

impl PageSource for HttpSource {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        let t0 = Instant::now();
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Non-success response");
            return Err(AppError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = resp.url().clone();
        let html = resp.text().await?;
        debug!(
            bytes = html.len(),
            %final_url,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(FetchedPage { final_url, html })
    }
}

/// In-memory pages keyed by URL.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct StaticSource {
    pages: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl StaticSource {
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[cfg(test)]
impl PageSource for StaticSource {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        match self.pages.get(url.as_str()) {
            Some(html) => Ok(FetchedPage {
                final_url: url.clone(),
                html: html.clone(),
            }),
            None => Err(AppError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
