// src/services/crawler.rs

//! Page crawler.
//!
//! Fetches a start page, collects the links matching a selector and
//! downloads every linked page with bounded concurrency. Individual requests
//! are retried on transport errors and server-side failures.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;
use crate::utils::resolve_url;

/// A downloaded HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub html: String,
}

impl Page {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}

/// What to crawl and how hard to try.
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    /// Start page
    pub url: String,

    /// Selector for links on the start page to follow
    pub link_selector: String,

    /// Maximum requests in flight
    pub concurrency: usize,

    /// Extra attempts per page after the first failure
    pub max_retries: u32,
}

/// Start page plus linked pages in completion order.
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub primary: Page,
    pub linked: Vec<Page>,
}

/// Source of crawled pages.
#[async_trait]
pub trait PageCrawler: Send + Sync {
    /// Fetch the start page and every page it links to via the selector.
    ///
    /// Fails only if the start page cannot be fetched. Linked pages that
    /// fail are left out of the result.
    async fn crawl(&self, request: &CrawlRequest) -> Result<CrawlResult>;
}

struct FetchFailure {
    error: AppError,
    retryable: bool,
}

/// [`PageCrawler`] over HTTP.
pub struct HttpCrawler {
    client: Client,
    retry_delay: Duration,
}

impl HttpCrawler {
    /// Create a new crawler with the given configuration.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    async fn fetch_with_retry(&self, url: &str, max_retries: u32) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(failure) if failure.retryable && attempt < max_retries => {
                    attempt += 1;
                    log::warn!(
                        "Fetch of {} failed ({}), retry {}/{}",
                        url,
                        failure.error,
                        attempt,
                        max_retries
                    );
                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
                Err(failure) => return Err(failure.error),
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> std::result::Result<String, FetchFailure> {
        let response = self.client.get(url).send().await.map_err(|e| FetchFailure {
            error: AppError::Http(e),
            retryable: true,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure {
                error: AppError::crawl(url, format!("HTTP {status}")),
                retryable: is_retryable(status),
            });
        }

        response.text().await.map_err(|e| FetchFailure {
            error: AppError::Http(e),
            retryable: true,
        })
    }
}

#[async_trait]
impl PageCrawler for HttpCrawler {
    async fn crawl(&self, request: &CrawlRequest) -> Result<CrawlResult> {
        log::info!("Crawling {}", request.url);

        let html = self
            .fetch_with_retry(&request.url, request.max_retries)
            .await
            .map_err(|e| match e {
                AppError::Crawl { .. } => e,
                other => AppError::crawl(&request.url, other),
            })?;
        let links = collect_links(&html, &request.url, &request.link_selector)?;
        log::info!("Found {} linked pages on {}", links.len(), request.url);

        let max_retries = request.max_retries;
        let mut page_stream = stream::iter(links)
            .map(|url| async move {
                let result = self.fetch_with_retry(&url, max_retries).await;
                (url, result)
            })
            .buffer_unordered(request.concurrency.max(1));

        let mut linked = Vec::new();
        let mut failures = 0;
        while let Some((url, result)) = page_stream.next().await {
            match result {
                Ok(html) if html.trim().is_empty() => {
                    log::debug!("Skipping empty document {}", url);
                }
                Ok(html) => linked.push(Page { url, html }),
                Err(error) => {
                    failures += 1;
                    log::warn!("Failed to fetch linked page {}: {}", url, error);
                }
            }
        }

        log::info!(
            "Crawl of {} complete: {} linked pages, {} failures",
            request.url,
            linked.len(),
            failures
        );

        Ok(CrawlResult {
            primary: Page::new(request.url.clone(), html),
            linked,
        })
    }
}

/// 5xx and 429 are worth another try; other client errors are final.
fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Absolute URLs of the elements matching `selector`, first occurrence order.
fn collect_links(html: &str, base_url: &str, selector: &str) -> Result<Vec<String>> {
    let selector =
        Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
    let base = Url::parse(base_url)?;
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let links = document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty() && !href.starts_with('#') && !href.starts_with("javascript:"))
        .map(|href| resolve_url(&base, href))
        .filter(|url| seen.insert(url.clone()))
        .collect();
    Ok(links)
}
