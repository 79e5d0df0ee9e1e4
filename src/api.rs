//! Remote model interaction for the AI-assisted collector.
//!
//! # Architecture
//!
//! - [`AskAsync`]: async extraction capability, so the collector can be driven
//!   by a stub in tests
//! - [`OpenAiExtractor`]: OpenAI-compatible chat-completions client that asks
//!   for a strict JSON-schema response
//!
//! No retries: a failed call fails that source.

use crate::config::ModelConfig;
use crate::error::{BoxError, PipelineError};
use crate::extractors::absolutize;
use crate::models::{AiArticle, AiArticles};
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Fixed extraction instruction sent with every page.
pub const INSTRUCTION: &str = "For all articles on the page, list the source of the page, the formatted URL of the article (which should match the source) without parameters, article publish date (in format YYYY-MM-DD), and article title";

/// Trait for async article extraction by a model.
pub trait AskAsync {
    /// The type of response returned by the model.
    type Response;

    /// Ask for the articles listed on `page`, which was fetched from `source`.
    async fn ask(&self, source: &str, page: &str) -> Result<Self::Response, BoxError>;
}

/// JSON schema of the expected answer: `{ articles: [{source, url, publish_date, title}] }`.
pub fn articles_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["articles"],
        "properties": {
            "articles": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["source", "url", "publish_date", "title"],
                    "properties": {
                        "source": { "type": "string", "description": "The source of the article" },
                        "url": { "type": "string", "description": "The URL of the article" },
                        "publish_date": {
                            "type": ["string", "null"],
                            "description": "The publication date of the article"
                        },
                        "title": { "type": "string", "description": "The title of the article" }
                    }
                }
            }
        }
    })
}

static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static TEXT_BLOCK: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, h2, h3, h4, p, time, li").unwrap());

/// Reduce an HTML page to what the model needs: anchor text with absolute
/// hrefs, then the visible text of headings, paragraphs, dates and list
/// items. The result is cut to `max_chars` characters.
pub fn condense_page(html: &str, source: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);
    let mut out = String::from("LINKS\n");

    for a in document.select(&LINK) {
        let text = a.text().collect::<Vec<_>>().join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            continue;
        }
        if let Some(href) = a.value().attr("href") {
            out.push_str(&format!("- {} -> {}\n", text, absolutize(source, href)));
        }
    }

    out.push_str("\nTEXT\n");
    for block in document.select(&TEXT_BLOCK) {
        let text = block.text().collect::<Vec<_>>().join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !text.is_empty() {
            out.push_str(&text);
            out.push('\n');
        }
    }

    match out.char_indices().nth(max_chars) {
        Some((cut, _)) => out[..cut].to_string(),
        None => out,
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible extraction client.
pub struct OpenAiExtractor {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_page_chars: usize,
}

impl fmt::Debug for OpenAiExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiExtractor")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_page_chars", &self.max_page_chars)
            .finish()
    }
}

impl OpenAiExtractor {
    /// Build a client from the model section of the configuration. Fails with
    /// [`PipelineError::MissingApiKey`] when no key was supplied.
    pub fn new(model: &ModelConfig) -> Result<Self, BoxError> {
        let api_key = model.api_key.clone().ok_or(PipelineError::MissingApiKey)?;
        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: model.base_url.trim_end_matches('/').to_string(),
            model: model.name.clone(),
            max_page_chars: model.max_page_chars,
        })
    }

    fn headers(&self) -> Result<HeaderMap, BoxError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Request body for one page.
    pub fn request_body(&self, source: &str, page: &str) -> Value {
        let condensed = condense_page(page, source, self.max_page_chars);
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": INSTRUCTION },
                { "role": "user", "content": format!("Source: {source}\n\n{condensed}") }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "articles",
                    "strict": true,
                    "schema": articles_schema()
                }
            }
        })
    }
}

/// Parse the model's message content into articles.
pub fn parse_articles(source: &str, content: &str) -> Result<Vec<AiArticle>, BoxError> {
    match serde_json::from_str::<AiArticles>(content) {
        Ok(parsed) => Ok(parsed.articles),
        Err(e) => {
            warn!(
                error = %e,
                response_preview = %truncate_for_log(content, 300),
                "Model returned non-conforming JSON"
            );
            Err(PipelineError::EmptyModelResponse {
                source_url: source.to_string(),
            }
            .into())
        }
    }
}

impl AskAsync for OpenAiExtractor {
    type Response = Vec<AiArticle>;

    #[instrument(level = "info", skip(self, page))]
    async fn ask(&self, source: &str, page: &str) -> Result<Self::Response, BoxError> {
        let t0 = Instant::now();
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, "Chat completion request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&self.request_body(source, page))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(status, elapsed_ms = t0.elapsed().as_millis() as u64, "API call failed");
            return Err(PipelineError::ModelApi { status, message }.into());
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PipelineError::EmptyModelResponse {
                source_url: source.to_string(),
            })?;

        let articles = parse_articles(source, &content)?;
        info!(
            count = articles.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Model extracted articles"
        );
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_config(key: Option<&str>) -> ModelConfig {
        ModelConfig {
            api_key: key.map(str::to_string),
            max_page_chars: 10_000,
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_missing_api_key() {
        let err = OpenAiExtractor::new(&model_config(None)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingApiKey)
        ));
    }

    #[test]
    fn test_schema_requires_every_field() {
        let schema = articles_schema();
        let required = &schema["properties"]["articles"]["items"]["required"];
        assert_eq!(required.as_array().unwrap().len(), 4);
        assert_eq!(
            schema["properties"]["articles"]["items"]["properties"]["publish_date"]["type"],
            json!(["string", "null"])
        );
    }

    #[test]
    fn test_condense_page_resolves_links_and_drops_markup() {
        let html = r#"<html><head><style>.x{}</style></head><body>
            <h2><a href="/post-1/">First   post</a></h2>
            <p>2024-10-10</p>
            <a href="/empty"></a>
        </body></html>"#;
        let out = condense_page(html, "https://blog.cloudflare.com/", 10_000);
        assert!(out.contains("- First post -> https://blog.cloudflare.com/post-1/"));
        assert!(out.contains("2024-10-10"));
        assert!(!out.contains("/empty"));
        assert!(!out.contains(".x{}"));
    }

    #[test]
    fn test_condense_page_truncates() {
        let html = format!("<p>{}</p>", "é".repeat(500));
        let out = condense_page(&html, "https://x/", 50);
        assert_eq!(out.chars().count(), 50);
    }

    #[test]
    fn test_request_body_shape() {
        let client = OpenAiExtractor::new(&model_config(Some("sk-test"))).unwrap();
        let body = client.request_body("https://blog.cloudflare.com/", "<p>hi</p>");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["content"], INSTRUCTION);
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert!(
            body["messages"][1]["content"]
                .as_str()
                .unwrap()
                .starts_with("Source: https://blog.cloudflare.com/")
        );
    }

    #[test]
    fn test_parse_articles() {
        let ok = parse_articles(
            "s",
            r#"{"articles":[{"source":"s","url":"https://x/a","publish_date":"2024-10-10","title":"A"}]}"#,
        )
        .unwrap();
        assert_eq!(ok[0].publish_date.as_deref(), Some("2024-10-10"));

        let err = parse_articles("s", r#"{"articles": ["#).unwrap_err();
        assert!(err.to_string().contains("no usable content"));
    }
}
