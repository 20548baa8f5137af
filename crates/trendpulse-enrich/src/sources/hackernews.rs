//! Hacker News search adapter (Algolia API, no credentials).

use async_trait::async_trait;
use serde::Deserialize;

use super::retry::retry_with_backoff;
use super::{decode_json, join_url, SourceFetcher, SourcePolicy};
use crate::error::SourceError;
use crate::types::{NormalizedItem, Source, Timestamp};

const SOURCE_NAME: &str = "hackernews";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    title: Option<String>,
    story_title: Option<String>,
    url: Option<String>,
    story_url: Option<String>,
    points: Option<i64>,
    created_at: Option<String>,
}

impl From<Hit> for NormalizedItem {
    fn from(hit: Hit) -> Self {
        let title = hit.title.or(hit.story_title).unwrap_or_default();
        let mut item = NormalizedItem::new(Source::HackerNews, title);
        item.url = hit.url.or(hit.story_url);
        item.metric = Some(hit.points.unwrap_or(0));
        item.timestamp = hit.created_at.map(Timestamp::Text);
        item
    }
}

pub struct HackerNewsFetcher {
    client: reqwest::Client,
    api_url: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl HackerNewsFetcher {
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be constructed.
    pub fn new(api_url: &str, policy: &SourcePolicy) -> Result<Self, SourceError> {
        Ok(Self {
            client: policy.build_client()?,
            api_url: api_url.to_owned(),
            max_retries: policy.max_retries,
            backoff_base_ms: policy.backoff_base_ms,
        })
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<NormalizedItem>, SourceError> {
        let hits_per_page = limit.to_string();
        let response = self
            .client
            .get(join_url(&self.api_url, "search"))
            .query(&[("query", query), ("hitsPerPage", hits_per_page.as_str())])
            .send()
            .await?;
        let body: SearchResponse = decode_json(SOURCE_NAME, response).await?;
        Ok(body.hits.into_iter().map(NormalizedItem::from).collect())
    }
}

#[async_trait]
impl SourceFetcher for HackerNewsFetcher {
    fn source(&self) -> Source {
        Source::HackerNews
    }

    async fn try_fetch(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<NormalizedItem>, SourceError> {
        let mut items = retry_with_backoff(
            SOURCE_NAME,
            self.max_retries,
            self.backoff_base_ms,
            || self.search(query, limit),
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
    fn comment_hits_fall_back_to_story_fields() {
        let hit: Hit = serde_json::from_value(serde_json::json!({
            "title": null,
            "story_title": "Show HN: a parser",
            "url": null,
            "story_url": "https://example.com/parser",
            "created_at": "2024-05-01T12:00:00.000Z"
        }))
        .unwrap();
        let item = NormalizedItem::from(hit);
        assert_eq!(item.title, "Show HN: a parser");
        assert_eq!(item.url.as_deref(), Some("https://example.com/parser"));
        assert_eq!(item.metric, Some(0));
        assert_eq!(
            item.timestamp,
            Some(Timestamp::Text("2024-05-01T12:00:00.000Z".to_owned()))
        );
    }

    #[test]
    fn hit_without_any_title_is_blank() {
        let hit: Hit = serde_json::from_str("{}").unwrap();
        let item = NormalizedItem::from(hit);
        assert_eq!(item.title, "");
        assert!(item.url.is_none());
        assert!(item.timestamp.is_none());
    }
}
