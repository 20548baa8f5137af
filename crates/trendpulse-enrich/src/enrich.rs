//! Concurrent, isolated per-item sentiment enrichment.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio_util::task::AbortOnDropHandle;
use trendpulse_core::AppConfig;

use crate::scorer::SentimentScorer;
use crate::types::{NormalizedItem, SentimentResult};

/// Bounds for the enrichment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichSettings {
    /// Items scored at once. Values below one are treated as one.
    pub max_concurrency: usize,
    /// Upper bound on a single item's scoring call.
    pub score_timeout: Duration,
}

impl EnrichSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_concurrency: config.enrich_max_concurrency,
            score_timeout: Duration::from_millis(config.score_timeout_ms),
        }
    }
}

impl Default for EnrichSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            score_timeout: Duration::from_secs(2),
        }
    }
}

/// Attach a sentiment to every item, preserving order and count.
///
/// Each item is scored in its own task. A timeout, a panic inside the
/// scorer, or a non-finite score yields the neutral fallback for that item
/// only. Items that already carry a sentiment are passed through untouched.
/// Dropping the returned future aborts every scoring task still running.
pub async fn enrich_items(
    scorer: Arc<dyn SentimentScorer>,
    items: Vec<NormalizedItem>,
    settings: &EnrichSettings,
) -> Vec<NormalizedItem> {
    let timeout = settings.score_timeout;
    stream::iter(items)
        .map(|item| score_item(Arc::clone(&scorer), item, timeout))
        .buffered(settings.max_concurrency.max(1))
        .collect()
        .await
}

async fn score_item(
    scorer: Arc<dyn SentimentScorer>,
    item: NormalizedItem,
    timeout: Duration,
) -> NormalizedItem {
    if item.sentiment.is_some() {
        return item;
    }

    let text = item.scoring_text();
    let scorer_name = scorer.name();
    let task = tokio::spawn(async move { scorer.score(&text).await });
    let mut handle = AbortOnDropHandle::new(task);

    let sentiment = match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(result)) if result.score.is_finite() => result,
        Ok(Ok(result)) => {
            tracing::warn!(
                scorer = scorer_name,
                source = %item.source,
                score = result.score,
                "scorer returned a non-finite score, using neutral fallback"
            );
            SentimentResult::neutral()
        }
        Ok(Err(join_err)) => {
            tracing::warn!(
                scorer = scorer_name,
                source = %item.source,
                error = %join_err,
                "scoring task failed, using neutral fallback"
            );
            SentimentResult::neutral()
        }
        Err(_) => {
            tracing::warn!(
                scorer = scorer_name,
                source = %item.source,
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "scoring timed out, using neutral fallback"
            );
            SentimentResult::neutral()
        }
    };

    item.with_sentiment(sentiment)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::ScoreError;
    use crate::types::{SentimentLabel, Source};

    /// Scores by keyword so each failure mode can be triggered per item.
    struct ScriptedScorer {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        completed: AtomicUsize,
    }

    impl ScriptedScorer {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SentimentScorer for ScriptedScorer {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn try_score(&self, text: &str) -> Result<SentimentResult, ScoreError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = match text {
                t if t.contains("slow") => 5_000,
                t if t.contains("late") => 40,
                _ => 5,
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.completed.fetch_add(1, Ordering::SeqCst);

            if text.contains("panic") {
                panic!("scorer exploded");
            }
            let score = if text.contains("nan") { f64::NAN } else { 0.5 };
            Ok(SentimentResult {
                label: SentimentLabel::Positive,
                score,
            })
        }
    }

    fn settings(max_concurrency: usize) -> EnrichSettings {
        EnrichSettings {
            max_concurrency,
            score_timeout: Duration::from_millis(500),
        }
    }

    fn items(titles: &[&str]) -> Vec<NormalizedItem> {
        titles
            .iter()
            .map(|t| NormalizedItem::new(Source::HackerNews, *t))
            .collect()
    }

    #[tokio::test]
    async fn preserves_order_and_count() {
        let scorer = Arc::new(ScriptedScorer::new());
        let input = items(&["late one", "two", "late three", "four"]);
        let out = enrich_items(scorer, input.clone(), &settings(4)).await;

        let titles: Vec<_> = out.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["late one", "two", "late three", "four"]);
        assert!(out.iter().all(|i| i.sentiment.is_some()));
    }

    #[tokio::test]
    async fn failures_are_isolated_per_item() {
        let scorer = Arc::new(ScriptedScorer::new());
        let input = items(&["good", "slow", "panic", "nan", "fine"]);
        let out = enrich_items(scorer, input, &settings(8)).await;

        let scores: Vec<f64> = out
            .iter()
            .map(|i| i.sentiment.expect("every item is scored").score)
            .collect();
        assert_eq!(scores, [0.5, 0.0, 0.0, 0.0, 0.5]);
        assert_eq!(out[1].sentiment, Some(SentimentResult::neutral()));
        assert_eq!(out[2].sentiment, Some(SentimentResult::neutral()));
        assert_eq!(out[3].sentiment, Some(SentimentResult::neutral()));
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let scorer = Arc::new(ScriptedScorer::new());
        let input = items(&["late a", "late b", "late c", "late d", "late e", "late f"]);
        let out = enrich_items(
            Arc::clone(&scorer) as Arc<dyn SentimentScorer>,
            input,
            &settings(2),
        )
        .await;

        assert_eq!(out.len(), 6);
        assert!(scorer.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn dropping_the_request_aborts_scoring_tasks() {
        let scorer = Arc::new(ScriptedScorer::new());
        let settings = settings(2);
        let enrich = enrich_items(
            Arc::clone(&scorer) as Arc<dyn SentimentScorer>,
            items(&["late a", "late b"]),
            &settings,
        );
        assert!(tokio::time::timeout(Duration::from_millis(10), enrich)
            .await
            .is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(scorer.peak.load(Ordering::SeqCst), 2);
        assert_eq!(scorer.completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn already_scored_items_pass_through() {
        let scorer = Arc::new(ScriptedScorer::new());
        let preset = SentimentResult {
            label: SentimentLabel::Negative,
            score: -0.9,
        };
        let input = vec![NormalizedItem::new(Source::Reddit, "kept").with_sentiment(preset)];
        let out = enrich_items(scorer, input, &settings(1)).await;
        assert_eq!(out[0].sentiment, Some(preset));
    }

    #[tokio::test]
    async fn blank_titles_get_neutral_without_scoring() {
        let scorer = Arc::new(ScriptedScorer::new());
        let out = enrich_items(
            Arc::clone(&scorer) as Arc<dyn SentimentScorer>,
            items(&["", "   "]),
            &settings(2),
        )
        .await;
        assert!(out
            .iter()
            .all(|i| i.sentiment == Some(SentimentResult::neutral())));
        assert_eq!(scorer.peak.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_input_is_empty_output() {
        let scorer = Arc::new(ScriptedScorer::new());
        assert!(enrich_items(scorer, Vec::new(), &settings(4))
            .await
            .is_empty());
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let out = runtime.block_on(enrich_items(
            Arc::new(ScriptedScorer::new()),
            items(&["a", "b"]),
            &settings(0),
        ));
        assert_eq!(out.len(), 2);
    }
}
