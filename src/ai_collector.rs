//! AI-assisted collector.
//!
//! For each AI source the page is fetched, condensed and handed to the remote
//! model with a fixed instruction and output schema. Returned articles are
//! stamped with their source and written out verbatim: no date normalization
//! and no dedup here, the merge stage does both.
//!
//! A source whose fetch or model call fails is logged and skipped, the same
//! isolation the scripted collector applies.

use crate::api::{AskAsync, OpenAiExtractor};
use crate::config::{Config, HttpConfig};
use crate::error::BoxError;
use crate::fetch::PageFetcher;
use crate::models::{AI_COLUMNS, AiArticle};
use crate::outputs::dataset;
use crate::utils::pause_between_sources;
use futures::stream::{self, StreamExt};
use tracing::{error, info, instrument};

/// Run every source through the model, one at a time.
#[instrument(level = "info", skip_all, fields(sources = sources.len()))]
pub async fn collect<M, F>(sources: &[String], model: &M, fetcher: &F, http: &HttpConfig) -> Vec<AiArticle>
where
    M: AskAsync<Response = Vec<AiArticle>>,
    F: PageFetcher,
{
    let per_source: Vec<Vec<AiArticle>> = stream::iter(sources.iter().enumerate())
        .then(|(i, source)| async move {
            if i > 0 {
                pause_between_sources(http).await;
            }

            let page = match fetcher.fetch(source).await {
                Ok(page) => page,
                Err(e) => {
                    error!(%source, error = %e, "Fetch failed; skipping source");
                    return Vec::new();
                }
            };

            match model.ask(source, &page).await {
                Ok(articles) => {
                    info!(%source, count = articles.len(), "Model returned articles");
                    articles
                        .into_iter()
                        .map(|article| AiArticle {
                            source: source.clone(),
                            ..article
                        })
                        .collect()
                }
                Err(e) => {
                    error!(%source, error = %e, "Extraction request failed; skipping source");
                    Vec::new()
                }
            }
        })
        .collect()
        .await;

    per_source.into_iter().flatten().collect()
}

/// The `ai-collect` stage end to end. Returns the number of saved articles.
///
/// A missing API key aborts before any request is made.
#[instrument(level = "info", skip_all)]
pub async fn run<F: PageFetcher>(config: &Config, fetcher: &F) -> Result<usize, BoxError> {
    let model = OpenAiExtractor::new(&config.model)?;
    let articles = collect(&config.ai_sources, &model, fetcher, &config.http).await;

    dataset::write_rows(&config.paths.ai_dataset, &articles, AI_COLUMNS)?;
    info!(
        count = articles.len(),
        path = %config.paths.ai_dataset.display(),
        "Saved AI-assisted articles"
    );
    Ok(articles.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::tests::{StubFetcher, quiet_config};
    use crate::error::PipelineError;
    use std::sync::Mutex;

    /// Answers from a fixed table; sources not in the table fail.
    struct StubModel {
        answers: Vec<(String, Vec<AiArticle>)>,
        asked: Mutex<Vec<String>>,
    }

    impl AskAsync for StubModel {
        type Response = Vec<AiArticle>;

        async fn ask(&self, source: &str, _page: &str) -> Result<Self::Response, BoxError> {
            self.asked.lock().unwrap().push(source.to_string());
            self.answers
                .iter()
                .find(|(s, _)| s == source)
                .map(|(_, a)| a.clone())
                .ok_or_else(|| {
                    PipelineError::ModelApi {
                        status: 500,
                        message: "boom".to_string(),
                    }
                    .into()
                })
        }
    }

    fn article(url: &str, source: &str) -> AiArticle {
        AiArticle {
            url: url.to_string(),
            title: "T".to_string(),
            source: source.to_string(),
            publish_date: Some("2024-10-10".to_string()),
        }
    }

    #[tokio::test]
    async fn test_articles_are_stamped_with_source() {
        let src = "https://blog.cloudflare.com/".to_string();
        let model = StubModel {
            answers: vec![(src.clone(), vec![article("https://blog.cloudflare.com/a", "cloudflare")])],
            asked: Mutex::new(Vec::new()),
        };
        let fetcher = StubFetcher::default().with(&src, "<p>page</p>");
        let config = quiet_config(vec![]);

        let articles = collect(&[src.clone()], &model, &fetcher, &config.http).await;
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].source, src);
        assert_eq!(articles[0].publish_date.as_deref(), Some("2024-10-10"));
    }

    #[tokio::test]
    async fn test_failing_source_is_isolated() {
        let good = "https://good.example/".to_string();
        let bad_model = "https://bad-model.example/".to_string();
        let bad_fetch = "https://bad-fetch.example/".to_string();
        let model = StubModel {
            answers: vec![(good.clone(), vec![article("https://good.example/a", ""), article("https://good.example/b", "")])],
            asked: Mutex::new(Vec::new()),
        };
        let fetcher = StubFetcher::default()
            .with(&good, "<p>ok</p>")
            .with(&bad_model, "<p>ok</p>");
        let config = quiet_config(vec![]);

        let sources = vec![bad_fetch.clone(), bad_model.clone(), good.clone()];
        let articles = collect(&sources, &model, &fetcher, &config.http).await;

        assert_eq!(articles.len(), 2);
        assert!(articles.iter().all(|a| a.source == good));
        // the unfetchable source never reaches the model
        assert_eq!(*model.asked.lock().unwrap(), vec![bad_model, good]);
    }

    #[tokio::test]
    async fn test_run_without_api_key_fails_before_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = quiet_config(vec![]);
        config.paths.ai_dataset = tmp.path().join("all_articles.csv");
        config.model.api_key = None;

        let err = run(&config, &StubFetcher::default()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingApiKey)
        ));
        assert!(!config.paths.ai_dataset.exists());
    }
}
