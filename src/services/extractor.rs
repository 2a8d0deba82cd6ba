// src/services/extractor.rs

//! Lectionary page extraction.
//!
//! Turns one downloaded readings page into a [`ReadingsPage`]: the liturgical
//! day header followed by every reading block that carries a title, a
//! citation, a passage and a source link. Everything here depends on the
//! upstream markup; when it changes the result silently shrinks.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{AppError, Result};
use crate::models::{ExtractorConfig, ReadingEntry, ReadingRecord, ReadingsPage};
use crate::utils::resolve;

/// Parses lectionary pages with a fixed set of selectors.
#[derive(Debug, Clone)]
pub struct ReadingsExtractor {
    header: Selector,
    block: Selector,
    title: Selector,
    address: Selector,
    body: Selector,
    body_fallback: Selector,
}

impl ReadingsExtractor {
    /// Compile the configured selectors.
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        Ok(Self {
            header: parse_selector(&config.header_selector)?,
            block: parse_selector(&config.block_selector)?,
            title: parse_selector(&config.title_selector)?,
            address: parse_selector(&config.address_selector)?,
            body: parse_selector(&config.body_selector)?,
            body_fallback: parse_selector(&config.body_fallback_selector)?,
        })
    }

    /// Extract the header and all complete reading entries from `html`.
    ///
    /// `page_url` is only used to resolve relative citation links.
    pub fn extract(&self, html: &str, page_url: &str) -> ReadingsPage {
        let document = Html::parse_document(html);

        let mass_id: String = document.select(&self.header).flat_map(|e| e.text()).collect();
        let mut page = vec![ReadingRecord::header(mass_id.trim())];

        for block in document.select(&self.block) {
            if let Some(entry) = self.parse_block(&block, page_url) {
                page.push(entry.into());
            }
        }

        log::debug!(
            "Extracted {} readings from {}",
            page.len() - 1,
            page_url
        );
        page
    }

    fn parse_block(&self, block: &ElementRef, page_url: &str) -> Option<ReadingEntry> {
        let title: String = block.select(&self.title).flat_map(|e| e.text()).collect();
        let address: String = block.select(&self.address).flat_map(|e| e.text()).collect();

        let mut body = text_with_breaks(block.select(&self.body));
        if body.trim().is_empty() {
            body = text_with_breaks(block.select(&self.body_fallback));
        }

        let source = block
            .select(&self.address)
            .find_map(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(|href| resolve(page_url, href))
            .unwrap_or_default();

        let entry = ReadingEntry {
            reading_title: title.trim().to_string(),
            reading_address: address.trim().to_string(),
            reading_body: body.trim().to_string(),
            reading_source: source,
        };
        entry.is_complete().then_some(entry)
    }
}

/// Concatenate the text of `elements`, turning `<br>` into `\n`.
///
/// Elements nested inside another matched element are skipped so their text
/// is not emitted twice.
fn text_with_breaks<'a>(elements: impl Iterator<Item = ElementRef<'a>>) -> String {
    let elements: Vec<ElementRef<'a>> = elements.collect();
    let matched: HashSet<_> = elements.iter().map(|e| e.id()).collect();

    let mut text = String::new();
    for element in &elements {
        if element.ancestors().any(|a| matched.contains(&a.id())) {
            continue;
        }
        for node in element.descendants() {
            match node.value() {
                Node::Text(t) => text.push_str(t),
                Node::Element(e) if e.name() == "br" => text.push('\n'),
                _ => {}
            }
        }
    }
    text
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{block_html, entry_for, page_html};

    const PAGE_URL: &str = "https://bible.usccb.org/bible/readings/101626.cfm";

    fn extractor() -> ReadingsExtractor {
        ReadingsExtractor::new(&ExtractorConfig::default()).unwrap()
    }

    #[test]
    fn test_two_good_blocks_and_one_empty_body() {
        let html = page_html(
            "Memorial of Saint Hedwig",
            &[
                block_html("Reading 1", "Rom 4:1-8", "Brothers and sisters:<br>What can we say"),
                block_html("Responsorial Psalm", "Ps 32:1b-2, 5, 11", ""),
                block_html("Gospel", "Lk 12:1-7", "At that time:<br/>Beware of the leaven"),
            ],
        );

        let page = extractor().extract(&html, PAGE_URL);

        assert_eq!(page.len(), 3);
        assert_eq!(page[0], ReadingRecord::header("Memorial of Saint Hedwig"));
        assert_eq!(
            page[1],
            ReadingRecord::from(entry_for(
                "Reading 1",
                "Rom 4:1-8",
                "Brothers and sisters:\nWhat can we say"
            ))
        );
        assert_eq!(
            page[2].as_entry().unwrap().reading_body,
            "At that time:\nBeware of the leaven"
        );
    }

    #[test]
    fn test_header_only_page() {
        let html = page_html(
            "Friday of the Twenty-eighth Week",
            &[block_html("Reading 1", "", "text without citation")],
        );

        let page = extractor().extract(&html, PAGE_URL);

        assert_eq!(page, vec![ReadingRecord::header("Friday of the Twenty-eighth Week")]);
    }

    #[test]
    fn test_missing_header_yields_empty_mass_id() {
        let page = extractor().extract("<html><body><p>Moved</p></body></html>", PAGE_URL);
        assert_eq!(page, vec![ReadingRecord::header("")]);
    }

    #[test]
    fn test_body_falls_back_to_content_body() {
        let html = r#"
            <div class="wr-block bg-white"><div><div>
              <div class="innerblock">
                <div class="content-header">
                  <h3 class="name"> Alleluia </h3>
                  <div class="address"><a href="/bible/psalms/95?8"> Ps 95:8 </a></div>
                </div>
                <div class="content-body"><p>R. Alleluia, alleluia.<br>If today you hear his voice</p></div>
              </div>
            </div></div></div>"#;

        let page = extractor().extract(html, PAGE_URL);
        let entry = page[1].as_entry().unwrap();

        assert_eq!(entry.reading_title, "Alleluia");
        assert_eq!(entry.reading_address, "Ps 95:8");
        assert_eq!(entry.reading_body, "R. Alleluia, alleluia.\nIf today you hear his voice");
        assert_eq!(entry.reading_source, "https://bible.usccb.org/bible/psalms/95?8");
    }

    #[test]
    fn test_whitespace_only_body_uses_fallback() {
        let html = r#"
            <div class="wr-block bg-white"><div><div>
              <div class="innerblock">
                <div class="content-header">
                  <h3>Responsorial Psalm</h3>
                  <div class="address"><a href="/bible/psalms/98?1">Ps 98:1</a></div>
                </div>
                <div class="content-body"><p><span><span> &nbsp; </span></span></p><p>Sing to the LORD a new song</p></div>
              </div>
            </div></div></div>"#;

        let page = extractor().extract(html, PAGE_URL);

        assert_eq!(page.len(), 2);
        assert_eq!(page[1].as_entry().unwrap().reading_body, "Sing to the LORD a new song");
    }

    #[test]
    fn test_block_without_href_is_dropped() {
        let html = r#"
            <div class="wr-block bg-white"><div><div>
              <div class="innerblock">
                <div class="content-header">
                  <h3>Gospel</h3>
                  <div class="address"><a>Lk 12:1-7</a></div>
                </div>
                <div class="content-body"><p><span><span>At that time</span></span></p></div>
              </div>
            </div></div></div>"#;

        assert_eq!(extractor().extract(html, PAGE_URL).len(), 1);
    }

    #[test]
    fn test_nested_body_matches_not_duplicated() {
        let html = r#"<div class="content-body"><p><span><span>outer <span>inner</span></span></span></p></div>"#;
        let document = Html::parse_fragment(html);
        let selector = Selector::parse(".content-body p span span").unwrap();

        assert_eq!(text_with_breaks(document.select(&selector)), "outer inner");
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        let config = ExtractorConfig {
            title_selector: "[[invalid".into(),
            ..ExtractorConfig::default()
        };
        assert!(ReadingsExtractor::new(&config).is_err());
    }
}
