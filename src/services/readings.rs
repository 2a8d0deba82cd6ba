// src/services/readings.rs

//! Readings service.
//!
//! Serves the cached collection when there is one, otherwise crawls the
//! day's lectionary page and its linked pages, extracts every page and
//! overwrites the cache with the result.

use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use serde_json::Value;

use crate::error::Result;
use crate::models::{Config, ReadingsCollection};
use crate::services::{CrawlRequest, CrawlResult, PageCrawler, ReadingsExtractor};
use crate::storage::DocumentStore;
use crate::utils::date;

/// Orchestrates validation, cache lookup, crawling and persistence.
pub struct ReadingsService {
    config: Arc<Config>,
    store: Arc<dyn DocumentStore>,
    crawler: Arc<dyn PageCrawler>,
    extractor: ReadingsExtractor,
    timezone: Tz,
}

impl ReadingsService {
    /// Create a service over the given store and crawler.
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn DocumentStore>,
        crawler: Arc<dyn PageCrawler>,
    ) -> Result<Self> {
        let extractor = ReadingsExtractor::new(&config.extractor)?;
        let timezone = config.schedule.timezone()?;
        Ok(Self {
            config,
            store,
            crawler,
            extractor,
            timezone,
        })
    }

    /// Normalize an optional request date to the `MMDDYY` fetch key.
    pub fn validate(&self, date: Option<&Value>) -> Result<String> {
        date::fetch_key(date, Utc::now(), self.timezone)
    }

    /// Handle one readings request.
    ///
    /// Invalid dates fail before any I/O. A cache hit is returned as is; a
    /// miss triggers a crawl for the requested date.
    pub async fn serve(&self, date: Option<&Value>) -> Result<ReadingsCollection> {
        let token = self.validate(date)?;

        if let Some(collection) = self.cached().await? {
            log::debug!("Cache hit for {}", self.config.store.cache_key);
            return Ok(collection);
        }

        log::info!("Cache miss, fetching readings for {}", token);
        self.refresh(&token).await
    }

    /// The cached collection, or `None` when the cache is empty.
    ///
    /// A record that no longer decodes is treated as empty.
    pub async fn cached(&self) -> Result<Option<ReadingsCollection>> {
        let key = &self.config.store.cache_key;
        Ok(self.store.get(key).await?.and_then(decode_cached))
    }

    /// Crawl, extract and persist the readings for `token`.
    ///
    /// The cache is only written once the whole crawl has succeeded.
    pub async fn refresh(&self, token: &str) -> Result<ReadingsCollection> {
        let crawler_config = &self.config.crawler;
        let request = CrawlRequest {
            url: crawler_config.readings_url(token),
            link_selector: crawler_config.link_selector.clone(),
            concurrency: crawler_config.max_concurrent,
            max_retries: crawler_config.max_retries,
        };

        let result = self.crawler.crawl(&request).await?;
        let collection = self.extract_all(&result);

        let encoded = serde_json::to_string(&collection)?;
        self.store
            .update(&self.config.store.cache_key, Value::String(encoded))
            .await?;
        log::info!(
            "Stored {} reading pages under {}",
            collection.len(),
            self.config.store.cache_key
        );

        Ok(collection)
    }

    /// Refresh today's readings, logging instead of returning failures.
    pub async fn daily_refresh(&self) {
        let outcome = match self.validate(None) {
            Ok(token) => self.refresh(&token).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(collection) => log::info!("Daily refresh stored {} pages", collection.len()),
            Err(e) => log::error!("Daily refresh failed: {}", e),
        }
    }

    /// Remove the cached record.
    pub async fn clear_cache(&self) -> Result<()> {
        self.store.delete(&self.config.store.cache_key).await
    }

    /// Extract the start page, then each linked page, keeping pages that
    /// produced at least one entry.
    pub fn extract_all(&self, result: &CrawlResult) -> ReadingsCollection {
        std::iter::once(&result.primary)
            .chain(&result.linked)
            .map(|page| self.extractor.extract(&page.html, &page.url))
            .filter(|page| page.len() > 1)
            .collect()
    }
}

fn decode_cached(value: Value) -> Option<ReadingsCollection> {
    let decoded = match value {
        Value::String(s) if s.trim().is_empty() => return None,
        Value::String(s) => serde_json::from_str::<ReadingsCollection>(&s),
        Value::Array(_) => serde_json::from_value::<ReadingsCollection>(value),
        _ => return None,
    };

    match decoded {
        Ok(collection) if collection.is_empty() => None,
        Ok(collection) => Some(collection),
        Err(e) => {
            log::warn!("Ignoring undecodable cached readings: {}", e);
            None
        }
    }
}
