//! HTTP client for a hosted sentiment classification model.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::SentimentScorer;
use crate::error::ScoreError;
use crate::trends::round4;
use crate::types::{SentimentLabel, SentimentResult};

/// Remote model backend.
///
/// Sends `{"inputs": text}` to `{url}/predict` and takes the highest-confidence
/// prediction. The score is that confidence, so it is always non-negative and
/// not on the same scale as the lexicon backends.
pub struct RemoteScorer {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    label: String,
    score: f64,
}

/// Some model servers wrap the per-input predictions in an outer batch array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictResponse {
    Flat(Vec<Prediction>),
    Batched(Vec<Vec<Prediction>>),
}

impl RemoteScorer {
    /// Create a new `RemoteScorer`.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreError::Http`] if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeout_ms: u64, user_agent: &str) -> Result<Self, ScoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/predict", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl SentimentScorer for RemoteScorer {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn try_score(&self, text: &str) -> Result<SentimentResult, ScoreError> {
        let response = self
            .client
            .post(&self.url)
            .json(&PredictRequest { inputs: text })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScoreError::UnexpectedStatus(response.status().as_u16()));
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| ScoreError::Malformed(format!("prediction parse error: {e}")))?;

        let predictions = match body {
            PredictResponse::Flat(p) => p,
            PredictResponse::Batched(batches) => batches.into_iter().next().unwrap_or_default(),
        };

        let top = predictions
            .into_iter()
            .filter(|p| p.score.is_finite())
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .ok_or_else(|| ScoreError::Malformed("no predictions returned".to_string()))?;

        let label = map_label(&top.label)
            .ok_or_else(|| ScoreError::Malformed(format!("unknown label '{}'", top.label)))?;

        Ok(SentimentResult {
            label,
            score: round4(top.score),
        })
    }
}

/// Map model labels to sentiment labels.
///
/// Accepts the `LABEL_0/1/2` convention (negative/neutral/positive) and
/// plain-text labels in any case.
fn map_label(raw: &str) -> Option<SentimentLabel> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "label_0" | "negative" | "neg" => Some(SentimentLabel::Negative),
        "label_1" | "neutral" | "neu" => Some(SentimentLabel::Neutral),
        "label_2" | "positive" | "pos" => Some(SentimentLabel::Positive),
        _ => None,
    }
}
