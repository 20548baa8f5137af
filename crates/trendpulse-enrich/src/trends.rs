//! Per-source trend aggregation.

use chrono::{DateTime, Utc};

use crate::error::TrendError;
use crate::types::{NormalizedItem, SentimentLabel, SourceTrendSummary, Timestamp};

/// Mean score above which a source is summarized as positive (below the
/// negated value, negative).
///
/// Independent of the per-item label threshold of any scorer backend, so an
/// overall label can disagree with every item's own label.
pub const OVERALL_THRESHOLD: f64 = 0.1;

/// Round to four decimal places.
pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Summarize one source's enriched items.
///
/// Never fails: any aggregation error is logged and replaced by the
/// zero-value summary so other sources and the response are unaffected.
#[must_use]
pub fn calculate_trends(items: &[NormalizedItem]) -> SourceTrendSummary {
    match try_calculate_trends(items) {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(error = %e, items = items.len(), "trend calculation failed");
            SourceTrendSummary::default()
        }
    }
}

/// Summarize one source's enriched items, reporting arithmetic problems.
///
/// - `frequency`: item count. Zero items yield the zero-value summary.
/// - `latest`: maximum parseable timestamp. Unparseable ones are skipped.
/// - `overall_sentiment`: mean score classified against [`OVERALL_THRESHOLD`].
/// - `sentiment_std`: sample standard deviation (n−1) of the scores, rounded
///   to four decimals; `0.0` with fewer than two scored items.
///
/// # Errors
///
/// Returns [`TrendError`] when a score or the resulting statistics are not finite.
pub fn try_calculate_trends(items: &[NormalizedItem]) -> Result<SourceTrendSummary, TrendError> {
    if items.is_empty() {
        return Ok(SourceTrendSummary::default());
    }

    let latest = items.iter().filter_map(item_instant).max();

    let mut scores = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if let Some(sentiment) = &item.sentiment {
            if !sentiment.score.is_finite() {
                return Err(TrendError::NonFiniteScore { index });
            }
            scores.push(sentiment.score);
        }
    }

    let mean = mean(&scores);
    let std = sample_std(&scores, mean);
    if !mean.is_finite() || !std.is_finite() {
        return Err(TrendError::NonFiniteStatistic { mean, std });
    }

    Ok(SourceTrendSummary {
        frequency: items.len(),
        latest,
        overall_sentiment: classify_mean(mean),
        sentiment_std: round4(std),
    })
}

fn item_instant(item: &NormalizedItem) -> Option<DateTime<Utc>> {
    let raw = item.timestamp.as_ref()?;
    let parsed = raw.to_utc();
    if parsed.is_none() {
        match raw {
            Timestamp::Text(text) => {
                tracing::warn!(source = %item.source, timestamp = %text, "skipping unparseable timestamp");
            }
            Timestamp::EpochSeconds(secs) => {
                tracing::warn!(source = %item.source, timestamp = secs, "skipping out-of-range timestamp");
            }
        }
    }
    parsed
}

#[allow(clippy::cast_precision_loss)]
fn mean(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

#[allow(clippy::cast_precision_loss)]
fn sample_std(scores: &[f64], mean: f64) -> f64 {
    if scores.len() < 2 {
        return 0.0;
    }
    let sum_sq: f64 = scores.iter().map(|s| (s - mean).powi(2)).sum();
    (sum_sq / (scores.len() - 1) as f64).sqrt()
}

fn classify_mean(mean: f64) -> SentimentLabel {
    if mean > OVERALL_THRESHOLD {
        SentimentLabel::Positive
    } else if mean < -OVERALL_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}
