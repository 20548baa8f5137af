//! Command handlers for the CLI.

use std::collections::HashSet;

use trendpulse_core::AppConfig;
use trendpulse_enrich::{
    build_scorer, EnrichRequest, EnrichResponse, NormalizedItem, Pipeline, Source,
    SourceTrendSummary,
};

use crate::MAX_COMPARE_QUERIES;

/// Run the pipeline for one query and print the response envelope.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be built, the query is blank, or
/// the pipeline fails.
pub(crate) async fn run_enrich(
    config: &AppConfig,
    query: &str,
    limit: Option<usize>,
    pretty: bool,
) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let request = EnrichRequest::new(Some(query), config.normalize_limit(limit))?;
    let response = pipeline.run(&request).await?;

    let rendered = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{rendered}");
    Ok(())
}

/// Run the pipeline for each query in turn and print a trend table.
///
/// Queries run sequentially so upstream rate limits are shared fairly.
/// A query that fails is reported in the table and does not stop the others.
///
/// # Errors
///
/// Returns an error if the query list is invalid or the pipeline cannot be built.
pub(crate) async fn run_compare(
    config: &AppConfig,
    queries: &[String],
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let queries = validate_compare_queries(queries)?;
    let pipeline = Pipeline::from_config(config)?;
    let limit = config.normalize_limit(limit);

    println!("{}", header_row());
    for query in &queries {
        let request = EnrichRequest::new(Some(query), limit)?;
        match pipeline.run(&request).await {
            Ok(response) => {
                for source in Source::ALL {
                    println!("{}", format_trend_row(query, source, &response));
                }
            }
            Err(e) => {
                tracing::error!(query = %query, error = %e, "compare query failed");
                println!("{query:<20}{:<12}failed: {e}", "-");
            }
        }
    }
    Ok(())
}

/// Score one text and print `label score`.
///
/// # Errors
///
/// Returns an error if the configured scorer cannot be built.
pub(crate) async fn run_score(config: &AppConfig, text: &str) -> anyhow::Result<()> {
    let scorer = build_scorer(config)?;
    let result = scorer.score(text).await;
    println!("{} {:.4}", result.label, result.score);
    Ok(())
}

/// Trim, drop blanks and duplicates, and enforce the query cap.
pub(crate) fn validate_compare_queries(queries: &[String]) -> anyhow::Result<Vec<String>> {
    let mut seen = HashSet::new();
    let cleaned: Vec<String> = queries
        .iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty() && seen.insert(q.to_lowercase()))
        .collect();

    if cleaned.is_empty() {
        anyhow::bail!("compare needs at least one non-blank --query");
    }
    if cleaned.len() > MAX_COMPARE_QUERIES {
        anyhow::bail!(
            "compare accepts at most {MAX_COMPARE_QUERIES} queries, got {}",
            cleaned.len()
        );
    }
    Ok(cleaned)
}

pub(crate) fn header_row() -> String {
    format!(
        "{:<20}{:<12}{:<7}{:<11}{:<8}{:<10}LATEST",
        "QUERY", "SOURCE", "ITEMS", "SENTIMENT", "STD", "MEAN"
    )
}

/// One table row: query, source, frequency, overall label, std, mean item
/// score and latest timestamp.
pub(crate) fn format_trend_row(query: &str, source: Source, response: &EnrichResponse) -> String {
    let zero = SourceTrendSummary::default();
    let trend = response.trend_for(source).unwrap_or(&zero);
    let latest = trend.latest.map_or_else(
        || "-".to_string(),
        |t| t.format("%Y-%m-%d %H:%M").to_string(),
    );
    let mean = mean_score(response.items_for(source))
        .map_or_else(|| "-".to_string(), |m| format!("{m:.4}"));

    format!(
        "{:<20}{:<12}{:<7}{:<11}{:<8.4}{:<10}{}",
        truncate(query, 19),
        source.as_str(),
        trend.frequency,
        trend.overall_sentiment.to_string(),
        trend.sentiment_std,
        mean,
        latest
    )
}

#[allow(clippy::cast_precision_loss)]
fn mean_score(items: &[NormalizedItem]) -> Option<f64> {
    let scores: Vec<f64> = items
        .iter()
        .filter_map(|i| i.sentiment.map(|s| s.score))
        .collect();
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
