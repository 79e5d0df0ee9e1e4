//! Site-specific article extractors.
//!
//! Each supported site layout is a [`SourceKind`] variant. Every variant turns a
//! fetched page body into a list of [`RawRecord`]s and never fails the whole
//! page because a sub-element is missing; placeholders are substituted instead.
//!
//! | Variant | Site | Cues |
//! |---------|------|------|
//! | [`SourceKind::TagListing`] | KDnuggets tag pages | `li` entries with a bold anchor |
//! | [`SourceKind::PostListing`] | BigDataWire article list | `div.post` containers |
//! | [`SourceKind::DynamicApp`] | Substack (Pragmatic Engineer) | JSON embedded in the rendered page |
//!
//! A host with no registered variant is routed to [`SourceKind::FALLBACK`].

use crate::models::RawRecord;
use serde::Deserialize;
use url::Url;

pub mod embedded_json;
pub mod post_listing;
pub mod tag_listing;

/// Common capability of every site variant.
pub trait Extractor {
    /// Extract article entries from `page`, fetched from `source`.
    fn extract(&self, page: &str, source: &str) -> Vec<RawRecord>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    TagListing,
    PostListing,
    DynamicApp,
}

/// Known hosts, matched as a suffix of the URL host.
const HOSTS: &[(&str, SourceKind)] = &[
    ("kdnuggets.com", SourceKind::TagListing),
    ("bigdatawire.com", SourceKind::PostListing),
    ("pragmaticengineer.com", SourceKind::DynamicApp),
];

impl SourceKind {
    /// Variant used for hosts that are not registered. Not guaranteed to find
    /// anything on an arbitrary site.
    pub const FALLBACK: SourceKind = SourceKind::TagListing;

    /// Registered variant for the host of `url`, if any.
    pub fn for_url(url: &str) -> Option<SourceKind> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        HOSTS
            .iter()
            .find(|(suffix, _)| host == *suffix || host.ends_with(&format!(".{suffix}")))
            .map(|(_, kind)| *kind)
    }

    /// Whether the page has to be rendered in a browser before extraction.
    pub fn needs_browser(&self) -> bool {
        matches!(self, SourceKind::DynamicApp)
    }

    /// Date-only formats this site's date text is written in.
    pub fn date_formats(&self) -> &'static [&'static str] {
        match self {
            SourceKind::TagListing => &["%b %d, %Y.", "%b %d, %Y"],
            SourceKind::PostListing => &["%B %d, %Y", "%Y/%m/%d"],
            SourceKind::DynamicApp => &["%Y-%m-%d"],
        }
    }
}

impl Extractor for SourceKind {
    fn extract(&self, page: &str, source: &str) -> Vec<RawRecord> {
        match self {
            SourceKind::TagListing => tag_listing::TagListing.extract(page, source),
            SourceKind::PostListing => post_listing::PostListing.extract(page, source),
            SourceKind::DynamicApp => embedded_json::EmbeddedJson.extract(page, source),
        }
    }
}

/// Resolve `href` against the listing page URL; unresolvable links are kept as-is.
pub(crate) fn absolutize(source: &str, href: &str) -> String {
    Url::parse(source)
        .and_then(|base| base.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Collapse the text of an element into a single trimmed string.
pub(crate) fn element_text(element: &scraper::ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
