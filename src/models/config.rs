//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Document store location and cache key
    #[serde(default)]
    pub store: StoreConfig,

    /// Daily refresh timer
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// CSS selectors for the lectionary markup
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if !self.crawler.url_template.contains("{date}") {
            return Err(AppError::validation(
                "crawler.url_template must contain a {date} placeholder",
            ));
        }
        if self.store.cache_key.trim().is_empty() {
            return Err(AppError::validation("store.cache_key is empty"));
        }
        self.schedule.timezone()?;
        if self.schedule.hour > 23 {
            return Err(AppError::validation("schedule.hour must be < 24"));
        }
        if self.schedule.minute > 59 {
            return Err(AppError::validation("schedule.minute must be < 60"));
        }

        let selectors = [
            &self.crawler.link_selector,
            &self.extractor.header_selector,
            &self.extractor.block_selector,
            &self.extractor.title_selector,
            &self.extractor.address_selector,
            &self.extractor.body_selector,
            &self.extractor.body_fallback_selector,
        ];
        for s in selectors {
            scraper::Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))?;
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `0.0.0.0:3000`
    #[serde(default = "defaults::bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: defaults::bind_addr(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Extra attempts for a failed request (404 and other 4xx are never retried)
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Pause before each retry in milliseconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,

    /// Start page URL; `{date}` is replaced by the `MMDDYY` token
    #[serde(default = "defaults::url_template")]
    pub url_template: String,

    /// Links on the start page leading to the alternative readings
    #[serde(default = "defaults::link_selector")]
    pub link_selector: String,
}

impl CrawlerConfig {
    /// Build the start URL for a normalized date token.
    pub fn readings_url(&self, token: &str) -> String {
        self.url_template.replace("{date}", token)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            max_retries: defaults::max_retries(),
            retry_delay_ms: defaults::retry_delay(),
            url_template: defaults::url_template(),
            link_selector: defaults::link_selector(),
        }
    }
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON file holding the store document
    #[serde(default = "defaults::store_path")]
    pub path: PathBuf,

    /// Key the current day's readings live under
    #[serde(default = "defaults::cache_key")]
    pub cache_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: defaults::store_path(),
            cache_key: defaults::cache_key(),
        }
    }
}

/// Daily refresh timer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "defaults::schedule_enabled")]
    pub enabled: bool,

    /// IANA timezone name the schedule and "today" are evaluated in
    #[serde(default = "defaults::timezone")]
    pub timezone: String,

    #[serde(default)]
    pub hour: u32,

    #[serde(default)]
    pub minute: u32,
}

impl ScheduleConfig {
    /// Parse the configured timezone.
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| AppError::validation(format!("schedule.timezone: {e}")))
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::schedule_enabled(),
            timezone: defaults::timezone(),
            hour: 0,
            minute: 0,
        }
    }
}

/// CSS selectors for scraping a lectionary page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Liturgical day heading
    #[serde(default = "defaults::header_selector")]
    pub header_selector: String,

    /// One element per reading
    #[serde(default = "defaults::block_selector")]
    pub block_selector: String,

    /// Reading heading, within a block
    #[serde(default = "defaults::title_selector")]
    pub title_selector: String,

    /// Citation link, within a block
    #[serde(default = "defaults::address_selector")]
    pub address_selector: String,

    /// Passage text, within a block
    #[serde(default = "defaults::body_selector")]
    pub body_selector: String,

    /// Broader passage selector used when `body_selector` yields no text
    #[serde(default = "defaults::body_fallback_selector")]
    pub body_fallback_selector: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            header_selector: defaults::header_selector(),
            block_selector: defaults::block_selector(),
            title_selector: defaults::title_selector(),
            address_selector: defaults::address_selector(),
            body_selector: defaults::body_selector(),
            body_fallback_selector: defaults::body_fallback_selector(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Server defaults
    pub fn bind_addr() -> String {
        "0.0.0.0:3000".into()
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; daily-readings/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_concurrent() -> usize {
        10
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn retry_delay() -> u64 {
        500
    }
    pub fn url_template() -> String {
        "https://bible.usccb.org/bible/readings/{date}.cfm".into()
    }
    pub fn link_selector() -> String {
        ".b-note div div .p-wrap ul li a".into()
    }

    // Store defaults
    pub fn store_path() -> PathBuf {
        PathBuf::from("storage/dailyReadingsDatabase.json")
    }
    pub fn cache_key() -> String {
        "dailyReadings".into()
    }

    // Schedule defaults
    pub fn schedule_enabled() -> bool {
        true
    }
    pub fn timezone() -> String {
        "America/Los_Angeles".into()
    }

    // Extractor defaults
    pub fn header_selector() -> String {
        ".wr-block.b-lectionary.padding-top-s.padding-bottom-xxs.bg-white div div .innerblock h2"
            .into()
    }
    pub fn block_selector() -> String {
        ".wr-block.bg-white div div div.innerblock".into()
    }
    pub fn title_selector() -> String {
        ".content-header h3".into()
    }
    pub fn address_selector() -> String {
        ".content-header .address a".into()
    }
    pub fn body_selector() -> String {
        ".content-body p span span".into()
    }
    pub fn body_fallback_selector() -> String {
        ".content-body".into()
    }
}
