use thiserror::Error;

/// Failures inside a source adapter. Never crosses the
/// [`crate::SourceFetcher::fetch`] boundary; the adapter logs it and yields
/// an empty item list instead.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("{source_name} rejected credentials (HTTP {status})")]
    Unauthorized {
        source_name: &'static str,
        status: u16,
    },

    #[error("rate limited by {url}")]
    RateLimited { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("{source_name} API error: {message}")]
    Api {
        source_name: &'static str,
        message: String,
    },
}

/// Failures inside a sentiment backend. Collapsed to the neutral fallback by
/// [`crate::SentimentScorer::score`].
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("scorer HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("scorer returned status {0}")]
    UnexpectedStatus(u16),

    #[error("malformed scorer output: {0}")]
    Malformed(String),
}

/// Arithmetic or shape problems while aggregating one source. Collapsed to
/// the zero-value summary by [`crate::calculate_trends`].
#[derive(Debug, Error)]
pub enum TrendError {
    #[error("item {index} has a non-finite sentiment score")]
    NonFiniteScore { index: usize },

    #[error("sentiment statistics are not finite (mean {mean}, std {std})")]
    NonFiniteStatistic { mean: f64, std: f64 },
}

/// Request-level outcomes that void the whole response.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The caller did not supply a usable query. Maps to a client error.
    #[error("missing 'query' parameter")]
    MissingQuery,

    /// An invariant broke after all per-stage recovery. Maps to a generic
    /// server error; the detail is for logs only.
    #[error("pipeline failed: {0}")]
    Internal(String),
}

/// Errors raised while wiring the pipeline at process start.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to build source client: {0}")]
    Source(#[from] SourceError),

    #[error("failed to build scorer: {0}")]
    Scorer(#[from] ScoreError),
}
