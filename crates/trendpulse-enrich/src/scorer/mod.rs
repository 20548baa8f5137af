//! Sentiment scoring capability and its interchangeable backends.

mod lexicon;
mod negation;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use trendpulse_core::{AppConfig, ScorerBackend};

use crate::error::ScoreError;
use crate::types::{SentimentLabel, SentimentResult};

pub use lexicon::LexiconScorer;
pub use negation::NegationScorer;
pub use remote::RemoteScorer;

/// Per-item label threshold shared by the lexicon backends.
pub(crate) const LABEL_THRESHOLD: f64 = 0.05;

/// A sentiment backend: text in, `{label, score}` out.
#[async_trait]
pub trait SentimentScorer: Send + Sync {
    /// Short backend name used in logs and health output.
    fn name(&self) -> &'static str;

    /// Score non-blank text, reporting backend failures as errors.
    async fn try_score(&self, text: &str) -> Result<SentimentResult, ScoreError>;

    /// Score `text` without ever failing.
    ///
    /// Blank text yields the neutral result without touching the backend;
    /// backend errors are logged and replaced by the neutral result.
    async fn score(&self, text: &str) -> SentimentResult {
        if text.trim().is_empty() {
            return SentimentResult::neutral();
        }
        match self.try_score(text).await {
            Ok(result) => result,
            Err(e) => {
                let preview: String = text.chars().take(60).collect();
                tracing::warn!(
                    scorer = self.name(),
                    error = %e,
                    text = %preview,
                    "sentiment scoring failed, using neutral fallback"
                );
                SentimentResult::neutral()
            }
        }
    }
}

/// Build the backend selected by `config.scorer`.
///
/// # Errors
///
/// Returns [`ScoreError`] if the remote backend's HTTP client cannot be
/// constructed or its URL is missing.
pub fn build_scorer(config: &AppConfig) -> Result<Arc<dyn SentimentScorer>, ScoreError> {
    let scorer: Arc<dyn SentimentScorer> = match config.scorer {
        ScorerBackend::Lexicon => Arc::new(LexiconScorer),
        ScorerBackend::Negation => Arc::new(NegationScorer),
        ScorerBackend::Remote => {
            let url = config.scorer_url.as_deref().ok_or_else(|| {
                ScoreError::Malformed("TRENDPULSE_SCORER_URL is not set".to_string())
            })?;
            Arc::new(RemoteScorer::new(
                url,
                config.score_timeout_ms,
                &config.user_agent,
            )?)
        }
    };
    tracing::info!(scorer = scorer.name(), "sentiment scorer ready");
    Ok(scorer)
}

pub(crate) fn label_for_score(score: f64) -> SentimentLabel {
    if score > LABEL_THRESHOLD {
        SentimentLabel::Positive
    } else if score < -LABEL_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// Lowercase alphanumeric tokens, apostrophes kept inside words ("isn't").
pub(crate) fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}
