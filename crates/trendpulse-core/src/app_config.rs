use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which sentiment scoring backend the process uses.
///
/// Chosen once at startup; every request in the process shares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerBackend {
    /// Weighted word lexicon, scores in `[-1.0, 1.0]`.
    Lexicon,
    /// Integer lexicon with negation handling, scores in `(-1.0, 1.0)`.
    Negation,
    /// Remote classification model, confidence-style scores.
    Remote,
}

impl std::fmt::Display for ScorerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScorerBackend::Lexicon => write!(f, "lexicon"),
            ScorerBackend::Negation => write!(f, "negation"),
            ScorerBackend::Remote => write!(f, "remote"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub default_limit: usize,
    pub max_limit: usize,
    pub scorer: ScorerBackend,
    pub scorer_url: Option<String>,
    pub score_timeout_ms: u64,
    pub enrich_max_concurrency: usize,
    pub source_timeout_secs: u64,
    pub source_max_retries: u32,
    pub source_backoff_base_ms: u64,
    pub user_agent: String,
    /// Bearer keys accepted by the HTTP server; empty disables auth in development.
    pub api_keys: Vec<String>,
    pub rate_limit_requests: usize,
    pub rate_limit_window_secs: u64,
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
    pub newsapi_api_key: Option<String>,
    pub reddit_auth_url: String,
    pub reddit_api_url: String,
    pub hn_api_url: String,
    pub newsapi_url: String,
}

impl AppConfig {
    /// Clamp a caller-supplied item limit into `1..=max_limit`, falling back
    /// to `default_limit` when absent.
    #[must_use]
    pub fn normalize_limit(&self, limit: Option<usize>) -> usize {
        limit
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("default_limit", &self.default_limit)
            .field("max_limit", &self.max_limit)
            .field("scorer", &self.scorer)
            .field("scorer_url", &self.scorer_url)
            .field("score_timeout_ms", &self.score_timeout_ms)
            .field("enrich_max_concurrency", &self.enrich_max_concurrency)
            .field("source_timeout_secs", &self.source_timeout_secs)
            .field("source_max_retries", &self.source_max_retries)
            .field("source_backoff_base_ms", &self.source_backoff_base_ms)
            .field("user_agent", &self.user_agent)
            .field("api_keys", &format_args!("[{} redacted]", self.api_keys.len()))
            .field("rate_limit_requests", &self.rate_limit_requests)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .field("reddit_client_id", &self.reddit_client_id)
            .field(
                "reddit_client_secret",
                &self.reddit_client_secret.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "newsapi_api_key",
                &self.newsapi_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("reddit_auth_url", &self.reddit_auth_url)
            .field("reddit_api_url", &self.reddit_api_url)
            .field("hn_api_url", &self.hn_api_url)
            .field("newsapi_url", &self.newsapi_url)
            .finish()
    }
}
