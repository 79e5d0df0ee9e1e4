//! Substack extractor for client-rendered pages.
//!
//! The rendered page embeds the post list as JSON, sometimes inside a
//! JavaScript string literal where every quote is backslash-escaped. That
//! outer layer is peeled off first, then the `canonical_url`, `title` and
//! `post_date` fields are read as JSON strings (so `\u2019` and `\"` decode)
//! and grouped per post: a field seen a second time starts the next post.

use super::Extractor;
use crate::models::{NO_DATE, NO_SUMMARY, RawRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use tracing::{debug, info};

static FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(canonical_url|title|post_date)"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap()
});

/// Marker of JSON embedded in a JavaScript string literal.
const ESCAPED_MARKER: &str = r#"\"canonical_url\""#;

pub struct EmbeddedJson;

#[derive(Default)]
struct PostFields {
    url: Option<String>,
    title: Option<String>,
    date: Option<String>,
}

impl PostFields {
    fn slot(&mut self, key: &str) -> &mut Option<String> {
        match key {
            "canonical_url" => &mut self.url,
            "title" => &mut self.title,
            _ => &mut self.date,
        }
    }

    fn into_record(self, source: &str) -> Option<RawRecord> {
        let url = self.url?;
        let title = self.title?;
        Some(RawRecord {
            title: title.trim().to_string(),
            link: strip_query(&url).to_string(),
            date_text: self.date.unwrap_or_else(|| NO_DATE.to_string()),
            summary: NO_SUMMARY.to_string(),
            source: source.to_string(),
        })
    }
}

/// Remove one level of JavaScript string escaping: `\"` becomes `"` and
/// `\\` becomes `\`. Other escapes are left for the JSON decoder.
fn unescape_js_layer(page: &str) -> String {
    let mut out = String::with_capacity(page.len());
    let mut chars = page.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next @ ('"' | '\\')) => out.push(next),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Decode the body of a JSON string literal, keeping the raw text if it is
/// not valid JSON.
fn decode_json_string(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_string())
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

impl Extractor for EmbeddedJson {
    fn extract(&self, page: &str, source: &str) -> Vec<RawRecord> {
        let text: Cow<'_, str> = if page.contains(ESCAPED_MARKER) {
            Cow::Owned(unescape_js_layer(page))
        } else {
            Cow::Borrowed(page)
        };

        let mut posts = Vec::new();
        let mut current = PostFields::default();
        for caps in FIELD.captures_iter(&text) {
            let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            if current.slot(key.as_str()).is_some() {
                posts.push(std::mem::take(&mut current));
            }
            *current.slot(key.as_str()) = Some(decode_json_string(value.as_str()));
        }
        posts.push(current);

        let total = posts.len();
        let records: Vec<RawRecord> = posts
            .into_iter()
            .filter_map(|post| post.into_record(source))
            .collect();
        if records.len() < total {
            debug!(incomplete = total - records.len(), source, "Embedded entries without url or title");
        }

        info!(count = records.len(), source, "Extracted embedded posts");
        records
    }
}
