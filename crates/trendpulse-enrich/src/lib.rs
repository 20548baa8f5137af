//! Fan-out fetch / enrich / aggregate pipeline for trendpulse.
//!
//! Pulls short-form content for a query from Reddit, Hacker News and
//! NewsAPI concurrently, scores every item's sentiment with the configured
//! backend, and reduces each source to a trend summary (volume, recency,
//! aggregate sentiment, sentiment dispersion). Source failures degrade to
//! empty results and scoring failures to a neutral sentiment; only a broken
//! pipeline invariant fails the whole request.

pub mod enrich;
pub mod error;
pub mod pipeline;
pub mod scorer;
pub mod sources;
pub mod trends;
pub mod types;

pub use enrich::{enrich_items, EnrichSettings};
pub use error::{BuildError, PipelineError, ScoreError, SourceError, TrendError};
pub use pipeline::{Pipeline, PipelineStage};
pub use scorer::{build_scorer, LexiconScorer, NegationScorer, RemoteScorer, SentimentScorer};
pub use sources::{
    default_fetchers, HackerNewsFetcher, NewsApiFetcher, RedditCredentials, RedditFetcher,
    SourceFetcher, SourcePolicy,
};
pub use trends::{calculate_trends, try_calculate_trends};
pub use types::{
    EnrichRequest, EnrichResponse, NormalizedItem, SentimentLabel, SentimentResult, Source,
    SourceTrendSummary, Timestamp,
};
