use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::PipelineError;

/// Upstream content providers. The serialized names double as response keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Discussion site.
    Reddit,
    /// Tech-news aggregator.
    HackerNews,
    /// News-article index.
    News,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Reddit, Source::HackerNews, Source::News];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Reddit => "reddit",
            Source::HackerNews => "hackernews",
            Source::News => "news",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SentimentLabel::Positive => write!(f, "Positive"),
            SentimentLabel::Neutral => write!(f, "Neutral"),
            SentimentLabel::Negative => write!(f, "Negative"),
        }
    }
}

/// Sentiment attached to one item.
///
/// `score` is on the producing backend's own scale. Scores from different
/// backends are not comparable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    pub score: f64,
}

impl SentimentResult {
    /// The fallback used for blank text and for any scoring failure.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            score: 0.0,
        }
    }
}

/// A creation/publication time as reported by the upstream source.
///
/// Kept in its raw form so responses echo exactly what the source sent;
/// [`Timestamp::to_utc`] normalizes it when the aggregator needs an instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    EpochSeconds(f64),
    Text(String),
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

impl Timestamp {
    /// Interpret the timestamp as a UTC instant.
    ///
    /// Numbers are epoch seconds. Strings are tried as RFC 3339, RFC 2822,
    /// ISO-8601 with a compact offset, then naive ISO-8601 date-times and
    /// plain dates (both taken as UTC). Returns `None` when nothing matches.
    #[must_use]
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::EpochSeconds(secs) => from_epoch_seconds(*secs),
            Timestamp::Text(raw) => parse_datetime(raw),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1_000_000_000.0).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// One content unit from any source, in the uniform shape the pipeline works on.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedItem {
    pub source: Source,
    pub title: String,
    /// Only article-index items carry a description.
    pub description: Option<String>,
    pub url: Option<String>,
    /// Score (Reddit) or points (Hacker News); absent for articles.
    pub metric: Option<i64>,
    pub timestamp: Option<Timestamp>,
    /// Set exactly once by the enrichment stage.
    pub sentiment: Option<SentimentResult>,
}

impl NormalizedItem {
    #[must_use]
    pub fn new(source: Source, title: impl Into<String>) -> Self {
        Self {
            source,
            title: title.into(),
            description: None,
            url: None,
            metric: None,
            timestamp: None,
            sentiment: None,
        }
    }

    /// The text handed to the sentiment scorer.
    ///
    /// Articles are scored on `"{title} {description}"` trimmed; everything
    /// else on the title alone.
    #[must_use]
    pub fn scoring_text(&self) -> String {
        match self.source {
            Source::News => {
                let description = self.description.as_deref().unwrap_or_default();
                // Only the outer ends are trimmed; inner whitespace from either
                // field is kept verbatim.
                format!("{} {}", self.title, description).trim().to_string()
            }
            Source::Reddit | Source::HackerNews => self.title.clone(),
        }
    }

    /// Attach a sentiment result. An already-set sentiment is kept as is.
    #[must_use]
    pub fn with_sentiment(mut self, sentiment: SentimentResult) -> Self {
        if self.sentiment.is_none() {
            self.sentiment = Some(sentiment);
        }
        self
    }
}

/// Per-source field layout of the response:
/// Reddit `{title, score, url, created, sentiment}`,
/// Hacker News `{title, points, url, created, sentiment}`,
/// NewsAPI `{title, url, publishedAt, sentiment}`.
impl Serialize for NormalizedItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("title", &self.title)?;
        match self.source {
            Source::Reddit => {
                map.serialize_entry("score", &self.metric.unwrap_or(0))?;
                map.serialize_entry("url", &self.url)?;
                map.serialize_entry("created", &self.timestamp)?;
            }
            Source::HackerNews => {
                map.serialize_entry("points", &self.metric.unwrap_or(0))?;
                map.serialize_entry("url", &self.url)?;
                map.serialize_entry("created", &self.timestamp)?;
            }
            Source::News => {
                map.serialize_entry("url", &self.url)?;
                map.serialize_entry("publishedAt", &self.timestamp)?;
            }
        }
        map.serialize_entry("sentiment", &self.sentiment)?;
        map.end()
    }
}

/// Trend statistics for one source's batch of enriched items.
///
/// `Default` is the zero-value summary used for empty sources and for
/// aggregation failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceTrendSummary {
    pub frequency: usize,
    pub latest: Option<DateTime<Utc>>,
    pub overall_sentiment: SentimentLabel,
    pub sentiment_std: f64,
}

/// A validated enrichment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichRequest {
    pub query: String,
    pub limit: usize,
}

impl EnrichRequest {
    /// Validate the raw query parameter.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingQuery`] when `query` is absent or blank.
    pub fn new(query: Option<&str>, limit: usize) -> Result<Self, PipelineError> {
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or(PipelineError::MissingQuery)?;
        Ok(Self {
            query: query.to_string(),
            limit: limit.max(1),
        })
    }
}

/// The response envelope:
/// `{"query": .., "trends": {<source>: summary}, "<source>": [items], ..}`.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichResponse {
    pub query: String,
    pub trends: BTreeMap<Source, SourceTrendSummary>,
    #[serde(flatten)]
    pub items: BTreeMap<Source, Vec<NormalizedItem>>,
}

impl EnrichResponse {
    #[must_use]
    pub fn items_for(&self, source: Source) -> &[NormalizedItem] {
        self.items.get(&source).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn trend_for(&self, source: Source) -> Option<&SourceTrendSummary> {
        self.trends.get(&source)
    }
}
