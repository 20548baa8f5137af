//! Source fetchers: Reddit, Hacker News and NewsAPI adapters.

mod hackernews;
mod newsapi;
mod reddit;
mod retry;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use trendpulse_core::AppConfig;

use crate::error::SourceError;
use crate::types::{NormalizedItem, Source};

pub use hackernews::HackerNewsFetcher;
pub use newsapi::NewsApiFetcher;
pub use reddit::{RedditCredentials, RedditFetcher};

/// One upstream content provider.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Which source this adapter feeds.
    fn source(&self) -> Source;

    /// Fetch up to `limit` items for `query`, in upstream order.
    async fn try_fetch(&self, query: &str, limit: usize)
        -> Result<Vec<NormalizedItem>, SourceError>;

    /// Fetch without ever failing.
    ///
    /// Any error is logged and reported as zero results from this source.
    async fn fetch(&self, query: &str, limit: usize) -> Vec<NormalizedItem> {
        match self.try_fetch(query, limit).await {
            Ok(items) => {
                tracing::info!(
                    source = %self.source(),
                    query,
                    count = items.len(),
                    "fetched items"
                );
                items
            }
            Err(e) => {
                tracing::warn!(
                    source = %self.source(),
                    query,
                    error = %e,
                    "source fetch failed, treating as empty"
                );
                Vec::new()
            }
        }
    }
}

/// HTTP policy shared by the source adapters.
#[derive(Debug, Clone)]
pub struct SourcePolicy {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub user_agent: String,
}

impl SourcePolicy {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.source_timeout_secs,
            max_retries: config.source_max_retries,
            backoff_base_ms: config.source_backoff_base_ms,
            user_agent: config.user_agent.clone(),
        }
    }

    /// Build the `reqwest` client every adapter uses.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the client cannot be constructed.
    pub(crate) fn build_client(&self) -> Result<reqwest::Client, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(self.timeout_secs.min(10)))
            .user_agent(&self.user_agent)
            .build()?;
        Ok(client)
    }
}

/// Build the three production fetchers from configuration.
///
/// Missing credentials do not fail here; the affected fetcher reports
/// [`SourceError::MissingCredentials`] per request and yields no items.
///
/// # Errors
///
/// Returns [`SourceError::Http`] if an HTTP client cannot be constructed.
pub fn default_fetchers(config: &AppConfig) -> Result<Vec<Arc<dyn SourceFetcher>>, SourceError> {
    let policy = SourcePolicy::from_config(config);

    let credentials = match (&config.reddit_client_id, &config.reddit_client_secret) {
        (Some(id), Some(secret)) => Some(RedditCredentials {
            client_id: id.clone(),
            client_secret: secret.clone(),
        }),
        _ => None,
    };

    let reddit = RedditFetcher::new(
        &config.reddit_auth_url,
        &config.reddit_api_url,
        credentials,
        &policy,
    )?;
    let hackernews = HackerNewsFetcher::new(&config.hn_api_url, &policy)?;
    let news = NewsApiFetcher::new(&config.newsapi_url, config.newsapi_api_key.clone(), &policy)?;

    Ok(vec![Arc::new(reddit), Arc::new(hackernews), Arc::new(news)])
}

/// Join a base URL and a path with exactly one slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Classify a response status and decode its JSON body.
///
/// # Errors
///
/// - [`SourceError::Unauthorized`] on 401/403.
/// - [`SourceError::RateLimited`] on 429.
/// - [`SourceError::UnexpectedStatus`] on any other non-2xx status.
/// - [`SourceError::Http`] if the body cannot be read.
/// - [`SourceError::Deserialize`] if the body does not match `T`.
pub(crate) async fn decode_json<T: DeserializeOwned>(
    source_name: &'static str,
    response: reqwest::Response,
) -> Result<T, SourceError> {
    let status = response.status();
    let url = response.url().to_string();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(SourceError::Unauthorized {
            source_name,
            status: status.as_u16(),
        });
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(SourceError::RateLimited { url });
    }
    if !status.is_success() {
        return Err(SourceError::UnexpectedStatus {
            status: status.as_u16(),
            url,
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
        context: format!("{source_name} response"),
        source: e,
    })
}
