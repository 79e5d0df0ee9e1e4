//! BigDataWire article-list extractor.
//!
//! Each `div.post` holds an `h3.post-title` link; the listing carries no date
//! element, so the date is read from the `/YYYY/MM/DD/` segment of the link.

use super::{Extractor, absolutize, element_text};
use crate::models::{NO_DATE, NO_SUMMARY, RawRecord};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::info;

static POST: Lazy<Selector> = Lazy::new(|| Selector::parse("div.post").unwrap());
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("h3.post-title a").unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static URL_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d{4}/\d{2}/\d{2})/").unwrap());

pub struct PostListing;

/// `October 04, 2024` from a link containing `/2024/10/04/`.
fn date_from_link(link: &str) -> Option<String> {
    let segment = URL_DATE.captures(link)?.get(1)?.as_str();
    let date = NaiveDate::parse_from_str(segment, "%Y/%m/%d").ok()?;
    Some(date.format("%B %d, %Y").to_string())
}

impl Extractor for PostListing {
    fn extract(&self, page: &str, source: &str) -> Vec<RawRecord> {
        let document = Html::parse_document(page);
        let mut records = Vec::new();

        for post in document.select(&POST) {
            let Some(anchor) = post.select(&TITLE_LINK).next() else {
                continue;
            };
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let link = absolutize(source, href);

            let summary = post
                .select(&PARAGRAPH)
                .next()
                .map(|p| element_text(&p))
                .unwrap_or_else(|| NO_SUMMARY.to_string());

            records.push(RawRecord {
                title: element_text(&anchor),
                date_text: date_from_link(&link).unwrap_or_else(|| NO_DATE.to_string()),
                link,
                summary,
                source: source.to_string(),
            });
        }

        info!(count = records.len(), source, "Extracted post listing");
        records
    }
}
