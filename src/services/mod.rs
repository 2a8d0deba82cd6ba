//! Service layer for the readings application.
//!
//! This module contains the business logic for:
//! - Page crawling (`PageCrawler`, `HttpCrawler`)
//! - Lectionary extraction (`ReadingsExtractor`)
//! - Cache-or-crawl orchestration (`ReadingsService`)

mod crawler;
mod extractor;
mod readings;

pub use crawler::{CrawlRequest, CrawlResult, HttpCrawler, Page, PageCrawler};
pub use extractor::ReadingsExtractor;
pub use readings::ReadingsService;
