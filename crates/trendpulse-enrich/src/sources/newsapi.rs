//! NewsAPI `/everything` adapter.

use async_trait::async_trait;
use serde::Deserialize;

use super::retry::retry_with_backoff;
use super::{decode_json, join_url, SourceFetcher, SourcePolicy};
use crate::error::SourceError;
use crate::types::{NormalizedItem, Source, Timestamp};

const SOURCE_NAME: &str = "news";
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EverythingResponse {
    status: String,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
}

impl From<Article> for NormalizedItem {
    fn from(article: Article) -> Self {
        let mut item = NormalizedItem::new(Source::News, article.title.unwrap_or_default());
        item.description = article.description;
        item.url = article.url;
        item.timestamp = article.published_at.map(Timestamp::Text);
        item
    }
}

pub struct NewsApiFetcher {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl NewsApiFetcher {
    /// Create a fetcher. `api_key = None` makes every fetch report
    /// [`SourceError::MissingCredentials`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be constructed.
    pub fn new(
        api_url: &str,
        api_key: Option<String>,
        policy: &SourcePolicy,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: policy.build_client()?,
            api_url: api_url.to_owned(),
            api_key,
            max_retries: policy.max_retries,
            backoff_base_ms: policy.backoff_base_ms,
        })
    }

    async fn everything(
        &self,
        api_key: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<NormalizedItem>, SourceError> {
        let page_size = limit.min(MAX_PAGE_SIZE).to_string();
        let response = self
            .client
            .get(join_url(&self.api_url, "everything"))
            .header("X-Api-Key", api_key)
            .query(&[
                ("q", query),
                ("pageSize", page_size.as_str()),
                ("sortBy", "relevancy"),
            ])
            .send()
            .await?;
        let body: EverythingResponse = decode_json(SOURCE_NAME, response).await?;
        if body.status != "ok" {
            return Err(SourceError::Api {
                source_name: SOURCE_NAME,
                message: body
                    .message
                    .unwrap_or_else(|| format!("status {}", body.status)),
            });
        }
        Ok(body.articles.into_iter().map(NormalizedItem::from).collect())
    }
}

#[async_trait]
impl SourceFetcher for NewsApiFetcher {
    fn source(&self) -> Source {
        Source::News
    }

    async fn try_fetch(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<NormalizedItem>, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SourceError::MissingCredentials("NEWSAPI_API_KEY"))?;
        let mut items = retry_with_backoff(
            SOURCE_NAME,
            self.max_retries,
            self.backoff_base_ms,
            || self.everything(api_key, query, limit),
        )
        .await?;
        items.truncate(limit);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_keeps_description_for_scoring() {
        let article: Article = serde_json::from_value(serde_json::json!({
            "title": "Markets rally",
            "description": "Stocks gain on strong earnings",
            "url": "https://example.com/markets",
            "publishedAt": "2024-05-01T08:30:00Z"
        }))
        .unwrap();
        let item = NormalizedItem::from(article);
        assert_eq!(item.metric, None);
        assert_eq!(
            item.scoring_text(),
            "Markets rally Stocks gain on strong earnings"
        );
        assert_eq!(
            item.timestamp,
            Some(Timestamp::Text("2024-05-01T08:30:00Z".to_owned()))
        );
    }

    #[test]
    fn error_envelope_parses() {
        let body: EverythingResponse = serde_json::from_str(
            r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#,
        )
        .unwrap();
        assert_eq!(body.status, "error");
        assert!(body.articles.is_empty());
    }
}
