//! KDnuggets tag-page extractor.
//!
//! Entries are `li` elements whose first class-less anchor wraps the title in
//! `<b>`. The date sits in a grey `font` element written like `- Oct 10, 2024.`
//! and the teaser in an indented `div`.

use super::{Extractor, absolutize, element_text};
use crate::models::{NO_DATE, NO_SUMMARY, RawRecord};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;

static ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static BOLD: Lazy<Selector> = Lazy::new(|| Selector::parse("b").unwrap());
static DATE: Lazy<Selector> = Lazy::new(|| Selector::parse(r##"font[color="#808080"]"##).unwrap());
static SUMMARY: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"div[style="margin-left: 12px; font-size: small;"]"#).unwrap());

pub struct TagListing;

impl Extractor for TagListing {
    fn extract(&self, page: &str, source: &str) -> Vec<RawRecord> {
        let document = Html::parse_document(page);
        let mut records = Vec::new();

        for item in document.select(&ITEM) {
            let Some(anchor) = item
                .select(&ANCHOR)
                .find(|a| a.value().attr("class").is_none())
            else {
                continue;
            };
            let Some(bold) = anchor.select(&BOLD).next() else {
                continue;
            };
            let Some(href) = anchor.value().attr("href") else {
                debug!(source, "Listing entry without href; skipping");
                continue;
            };

            let date_text = item
                .select(&DATE)
                .next()
                .map(|d| {
                    d.text()
                        .collect::<String>()
                        .trim_matches(|c| c == '-' || c == ' ')
                        .to_string()
                })
                .unwrap_or_else(|| NO_DATE.to_string());
            let summary = item
                .select(&SUMMARY)
                .next()
                .map(|s| element_text(&s))
                .unwrap_or_else(|| NO_SUMMARY.to_string());

            records.push(RawRecord {
                title: element_text(&bold),
                link: absolutize(source, href),
                date_text,
                summary,
                source: source.to_string(),
            });
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "https://www.kdnuggets.com/tag/data-engineering";

    #[test]
    fn test_extracts_full_entry() {
        let page = r##"<ul>
            <li>
              <a href="https://www.kdnuggets.com/2024/10/dbt-guide"><b>A Guide to dbt</b></a>
              <font color="#808080">- Oct 10, 2024.</font>
              <div style="margin-left: 12px; font-size: small;"> Models, tests and docs. </div>
            </li>
        </ul>"##;

        let records = TagListing.extract(page, SOURCE);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.title, "A Guide to dbt");
        assert_eq!(r.link, "https://www.kdnuggets.com/2024/10/dbt-guide");
        assert_eq!(r.date_text, "Oct 10, 2024.");
        assert_eq!(r.summary, "Models, tests and docs.");
        assert_eq!(r.source, SOURCE);
    }

    #[test]
    fn test_missing_optional_parts_use_placeholders() {
        let page = r#"<ul><li><a href="/2024/10/post"><b>Bare entry</b></a></li></ul>"#;

        let records = TagListing.extract(page, SOURCE);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date_text, NO_DATE);
        assert_eq!(records[0].summary, NO_SUMMARY);
        assert_eq!(records[0].link, "https://www.kdnuggets.com/2024/10/post");
    }

    #[test]
    fn test_skips_menu_items_and_classed_anchors() {
        let page = r#"<ul>
            <li><a href="/about">About</a></li>
            <li><a class="tag" href="/tag/x"><b>Tag link</b></a></li>
            <li><a><b>No href</b></a></li>
        </ul>"#;

        assert!(TagListing.extract(page, SOURCE).is_empty());
    }
}
