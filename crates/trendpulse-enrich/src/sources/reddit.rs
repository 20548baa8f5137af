//! Reddit search adapter (client-credentials OAuth).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::retry::retry_with_backoff;
use super::{decode_json, join_url, SourceFetcher, SourcePolicy};
use crate::error::SourceError;
use crate::types::{NormalizedItem, Source, Timestamp};

const SOURCE_NAME: &str = "reddit";
const MAX_PAGE_SIZE: usize = 100;
/// Tokens are treated as expired this long before Reddit says they are.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// App credentials for the client-credentials grant.
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn from_response(response: TokenResponse, now: Instant) -> Self {
        Self {
            value: response.access_token,
            expires_at: response
                .expires_in
                .map(|secs| now + Duration::from_secs(secs).saturating_sub(TOKEN_EXPIRY_MARGIN)),
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    title: Option<String>,
    score: Option<i64>,
    url: Option<String>,
    created_utc: Option<f64>,
}

impl From<PostData> for NormalizedItem {
    fn from(post: PostData) -> Self {
        let mut item = NormalizedItem::new(Source::Reddit, post.title.unwrap_or_default());
        item.metric = Some(post.score.unwrap_or(0));
        item.url = post.url;
        item.timestamp = post.created_utc.map(Timestamp::EpochSeconds);
        item
    }
}

/// Searches all of Reddit. The bearer token is exchanged on first use and
/// shared by later requests until it expires or Reddit rejects it.
pub struct RedditFetcher {
    client: reqwest::Client,
    auth_url: String,
    api_url: String,
    credentials: Option<RedditCredentials>,
    token: RwLock<Option<CachedToken>>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl RedditFetcher {
    /// Create a fetcher. `credentials = None` makes every fetch report
    /// [`SourceError::MissingCredentials`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be constructed.
    pub fn new(
        auth_url: &str,
        api_url: &str,
        credentials: Option<RedditCredentials>,
        policy: &SourcePolicy,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: policy.build_client()?,
            auth_url: auth_url.to_owned(),
            api_url: api_url.to_owned(),
            credentials,
            token: RwLock::new(None),
            max_retries: policy.max_retries,
            backoff_base_ms: policy.backoff_base_ms,
        })
    }

    async fn access_token(&self) -> Result<String, SourceError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(SourceError::MissingCredentials(
                "REDDIT_CLIENT_ID / REDDIT_CLIENT_SECRET",
            ))?;

        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_fresh(Instant::now()) {
                return Ok(token.value.clone());
            }
        }

        // Concurrent callers queue here behind a single exchange.
        let mut slot = self.token.write().await;
        if let Some(token) = slot.as_ref() {
            if token.is_fresh(Instant::now()) {
                return Ok(token.value.clone());
            }
        }

        let token = retry_with_backoff(
            SOURCE_NAME,
            self.max_retries,
            self.backoff_base_ms,
            || self.exchange_token(credentials),
        )
        .await?;
        tracing::debug!(source = SOURCE_NAME, "obtained access token");
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    /// Drops the cached token if it is still the one that was rejected.
    async fn invalidate_token(&self, rejected: &str) {
        let mut slot = self.token.write().await;
        if slot.as_ref().is_some_and(|t| t.value == rejected) {
            *slot = None;
        }
    }

    async fn exchange_token(
        &self,
        credentials: &RedditCredentials,
    ) -> Result<CachedToken, SourceError> {
        let response = self
            .client
            .post(join_url(&self.auth_url, "api/v1/access_token"))
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let token: TokenResponse = decode_json(SOURCE_NAME, response).await?;
        Ok(CachedToken::from_response(token, Instant::now()))
    }

    async fn search_with_retry(
        &self,
        token: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<NormalizedItem>, SourceError> {
        retry_with_backoff(SOURCE_NAME, self.max_retries, self.backoff_base_ms, || {
            self.search(token, query, limit)
        })
        .await
    }

    async fn search(
        &self,
        token: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<NormalizedItem>, SourceError> {
        let limit = limit.min(MAX_PAGE_SIZE).to_string();
        let response = self
            .client
            .get(join_url(&self.api_url, "r/all/search"))
            .bearer_auth(token)
            .query(&[
                ("q", query),
                ("limit", limit.as_str()),
                ("sort", "relevance"),
            ])
            .send()
            .await?;
        let listing: Listing = decode_json(SOURCE_NAME, response).await?;
        Ok(listing
            .data
            .children
            .into_iter()
            .map(|post| NormalizedItem::from(post.data))
            .collect())
    }
}

#[async_trait]
impl SourceFetcher for RedditFetcher {
    fn source(&self) -> Source {
        Source::Reddit
    }

    async fn try_fetch(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<NormalizedItem>, SourceError> {
        let token = self.access_token().await?;
        let mut items = match self.search_with_retry(&token, query, limit).await {
            Err(SourceError::Unauthorized { status, .. }) => {
                tracing::info!(
                    source = SOURCE_NAME,
                    status,
                    "access token rejected, exchanging a new one"
                );
                self.invalidate_token(&token).await;
                let token = self.access_token().await?;
                self.search_with_retry(&token, query, limit).await?
            }
            result => result?,
        };
        items.truncate(limit);
        Ok(items)
    }
}
