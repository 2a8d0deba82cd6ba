//! Fixtures and doubles shared by unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::ReadingEntry;
use crate::services::{CrawlRequest, CrawlResult, Page, PageCrawler};

/// Markup of one reading block in the lectionary layout.
pub fn block_html(title: &str, address: &str, body: &str) -> String {
    format!(
        r#"<div class="wr-block bg-white"><div><div><div class="innerblock"><div class="content-header"><h3 class="name">{title}</h3><div class="address"><a href="{href}">{address}</a></div></div><div class="content-body"><p><span><span>{body}</span></span></p></div></div></div></div></div>"#,
        href = source_for(address),
    )
}

/// A full page with a liturgical day header and the given blocks.
pub fn page_html(mass_id: &str, blocks: &[String]) -> String {
    format!(
        r#"<html><body>
        <div class="wr-block b-lectionary padding-top-s padding-bottom-xxs bg-white"><div><div><div class="innerblock"><h2> {mass_id} </h2></div></div></div></div>
        {blocks}
        </body></html>"#,
        blocks = blocks.concat(),
    )
}

/// The entry [`block_html`] should extract to, for bodies without markup.
pub fn entry_for(title: &str, address: &str, body: &str) -> ReadingEntry {
    ReadingEntry {
        reading_title: title.to_string(),
        reading_address: address.to_string(),
        reading_body: body.to_string(),
        reading_source: source_for(address),
    }
}

fn source_for(address: &str) -> String {
    let slug: String = address
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase();
    format!("https://bible.usccb.org/bible/{slug}")
}

/// Crawler double returning canned pages and counting invocations.
pub struct StubCrawler {
    result: Mutex<Option<CrawlResult>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<String>>,
}

impl StubCrawler {
    pub fn returning(primary: String, linked: Vec<String>) -> Self {
        let result = CrawlResult {
            primary: Page::new("https://bible.usccb.org/bible/readings/start.cfm", primary),
            linked: linked
                .into_iter()
                .enumerate()
                .map(|(i, html)| {
                    Page::new(format!("https://bible.usccb.org/bible/readings/{i}.cfm"), html)
                })
                .collect(),
        };
        Self {
            result: Mutex::new(Some(result)),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Mutex::new(None),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageCrawler for StubCrawler {
    async fn crawl(&self, request: &CrawlRequest) -> Result<CrawlResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.url.clone());
        self.result
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::crawl(&request.url, "connection refused"))
    }
}
