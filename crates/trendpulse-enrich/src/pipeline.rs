//! Request orchestration: fetch every source, enrich every item, aggregate
//! every source, assemble the response envelope.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use trendpulse_core::AppConfig;

use crate::enrich::{enrich_items, EnrichSettings};
use crate::error::{BuildError, PipelineError};
use crate::scorer::{build_scorer, SentimentScorer};
use crate::sources::{default_fetchers, SourceFetcher};
use crate::trends::calculate_trends;
use crate::types::{EnrichRequest, EnrichResponse, NormalizedItem, Source, SourceTrendSummary};

/// Where a request is in its lifecycle. A request that fails ends in
/// whichever stage raised the [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Fetching,
    Enriching,
    Aggregating,
    Done,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Fetching => write!(f, "fetching"),
            PipelineStage::Enriching => write!(f, "enriching"),
            PipelineStage::Aggregating => write!(f, "aggregating"),
            PipelineStage::Done => write!(f, "done"),
        }
    }
}

/// The fan-out fetch / enrich / aggregate pipeline.
///
/// Holds only process-scoped collaborators; all per-request state lives in
/// [`Pipeline::run`] and is dropped when it returns.
#[derive(Clone)]
pub struct Pipeline {
    fetchers: Vec<Arc<dyn SourceFetcher>>,
    scorer: Arc<dyn SentimentScorer>,
    settings: EnrichSettings,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        fetchers: Vec<Arc<dyn SourceFetcher>>,
        scorer: Arc<dyn SentimentScorer>,
        settings: EnrichSettings,
    ) -> Self {
        Self {
            fetchers,
            scorer,
            settings,
        }
    }

    /// Wire the production fetchers and the configured scorer backend.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if an HTTP client or the scorer cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, BuildError> {
        let fetchers = default_fetchers(config)?;
        let scorer = build_scorer(config)?;
        Ok(Self::new(
            fetchers,
            scorer,
            EnrichSettings::from_config(config),
        ))
    }

    #[must_use]
    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    #[must_use]
    pub fn scorer(&self) -> Arc<dyn SentimentScorer> {
        Arc::clone(&self.scorer)
    }

    /// Run one request to completion.
    ///
    /// Source failures, scoring failures and aggregation failures are all
    /// recovered inside their stage, so the response always carries every
    /// source (possibly empty, neutral or zero-valued).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Internal`] only when a stage hands on output
    /// that breaks the pipeline's own invariants.
    pub async fn run(&self, request: &EnrichRequest) -> Result<EnrichResponse, PipelineError> {
        let started = Instant::now();
        let result = self.execute(request).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(response) => tracing::info!(
                query = %request.query,
                limit = request.limit,
                reddit = response.items_for(Source::Reddit).len(),
                hackernews = response.items_for(Source::HackerNews).len(),
                news = response.items_for(Source::News).len(),
                elapsed_ms,
                "enrichment complete"
            ),
            Err(e) => tracing::error!(
                query = %request.query,
                error = %e,
                elapsed_ms,
                "enrichment failed"
            ),
        }
        result
    }

    async fn execute(&self, request: &EnrichRequest) -> Result<EnrichResponse, PipelineError> {
        let mut stage = PipelineStage::Fetching;
        tracing::debug!(query = %request.query, %stage, "pipeline stage");
        let fetched = self.fetch_all(&request.query, request.limit).await;

        stage = PipelineStage::Enriching;
        tracing::debug!(query = %request.query, %stage, "pipeline stage");
        let enriched = self.enrich_all(fetched).await?;

        stage = PipelineStage::Aggregating;
        tracing::debug!(query = %request.query, %stage, "pipeline stage");
        let trends = enriched
            .iter()
            .map(|(source, items)| (*source, aggregate(*source, items)))
            .collect();

        stage = PipelineStage::Done;
        tracing::debug!(query = %request.query, %stage, "pipeline stage");
        Ok(EnrichResponse {
            query: request.query.clone(),
            trends,
            items: enriched,
        })
    }

    /// Fetch all sources concurrently and wait for every one of them.
    ///
    /// Every known source gets an entry, even with no fetcher configured.
    async fn fetch_all(&self, query: &str, limit: usize) -> BTreeMap<Source, Vec<NormalizedItem>> {
        let handles = self.fetchers.iter().map(|fetcher| {
            let fetcher = Arc::clone(fetcher);
            let query = query.to_owned();
            let source = fetcher.source();
            (
                source,
                tokio::spawn(async move { fetcher.fetch(&query, limit).await }),
            )
        });
        let (sources, handles): (Vec<_>, Vec<_>) = handles.unzip();
        let results = join_all(handles).await;

        let mut fetched: BTreeMap<Source, Vec<NormalizedItem>> =
            Source::ALL.iter().map(|s| (*s, Vec::new())).collect();
        for (source, result) in sources.into_iter().zip(results) {
            match result {
                Ok(mut items) => {
                    items.truncate(limit);
                    fetched.entry(source).or_default().extend(items);
                }
                Err(join_err) => {
                    tracing::warn!(
                        source = %source,
                        query,
                        error = %join_err,
                        "fetch task failed, treating source as empty"
                    );
                }
            }
        }
        fetched
    }

    /// Score every item from every source in one bounded pool, then split
    /// the results back per source in fetch order.
    async fn enrich_all(
        &self,
        fetched: BTreeMap<Source, Vec<NormalizedItem>>,
    ) -> Result<BTreeMap<Source, Vec<NormalizedItem>>, PipelineError> {
        let counts: Vec<(Source, usize)> = fetched.iter().map(|(s, v)| (*s, v.len())).collect();
        let total: usize = counts.iter().map(|(_, n)| n).sum();
        let flat: Vec<NormalizedItem> = fetched.into_values().flatten().collect();

        let mut enriched = enrich_items(Arc::clone(&self.scorer), flat, &self.settings)
            .await
            .into_iter();

        let mut out = BTreeMap::new();
        for (source, count) in counts {
            let items: Vec<NormalizedItem> = enriched.by_ref().take(count).collect();
            if items.len() != count {
                return Err(PipelineError::Internal(format!(
                    "enrichment returned fewer items than fetched ({total} expected)"
                )));
            }
            if let Some(pos) = items
                .iter()
                .position(|i| i.sentiment.is_none() || i.source != source)
            {
                return Err(PipelineError::Internal(format!(
                    "{source} item {pos} left enrichment unscored or misplaced"
                )));
            }
            out.insert(source, items);
        }
        if enriched.next().is_some() {
            return Err(PipelineError::Internal(format!(
                "enrichment returned more items than fetched ({total} expected)"
            )));
        }
        Ok(out)
    }
}

/// Aggregate one source, containing any panic to that source.
fn aggregate(source: Source, items: &[NormalizedItem]) -> SourceTrendSummary {
    catch_unwind(AssertUnwindSafe(|| calculate_trends(items))).unwrap_or_else(|_| {
        tracing::error!(
            source = %source,
            items = items.len(),
            "trend aggregation panicked, using zero summary"
        );
        SourceTrendSummary::default()
    })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::SourceError;
    use crate::scorer::LexiconScorer;
    use crate::types::{SentimentLabel, Timestamp};

    struct StaticFetcher {
        source: Source,
        titles: Vec<&'static str>,
    }

    #[async_trait]
    impl SourceFetcher for StaticFetcher {
        fn source(&self) -> Source {
            self.source
        }

        async fn try_fetch(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<NormalizedItem>, SourceError> {
            Ok(self
                .titles
                .iter()
                .enumerate()
                .map(|(i, title)| {
                    let mut item = NormalizedItem::new(self.source, *title);
                    let day = i + 1;
                    item.timestamp = Some(Timestamp::Text(format!("2024-01-{day:02}T00:00:00Z")));
                    item
                })
                .collect())
        }
    }

    struct FailingFetcher(Source);

    #[async_trait]
    impl SourceFetcher for FailingFetcher {
        fn source(&self) -> Source {
            self.0
        }

        async fn try_fetch(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<NormalizedItem>, SourceError> {
            Err(SourceError::MissingCredentials("TEST_KEY"))
        }
    }

    struct PanickingFetcher(Source);

    #[async_trait]
    impl SourceFetcher for PanickingFetcher {
        fn source(&self) -> Source {
            self.0
        }

        async fn try_fetch(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<NormalizedItem>, SourceError> {
            panic!("adapter bug");
        }
    }

    fn pipeline(fetchers: Vec<Arc<dyn SourceFetcher>>) -> Pipeline {
        Pipeline::new(fetchers, Arc::new(LexiconScorer), EnrichSettings::default())
    }

    fn request(query: &str) -> EnrichRequest {
        EnrichRequest::new(Some(query), 20).unwrap()
    }

    #[tokio::test]
    async fn all_sources_present_with_matching_lengths() {
        let p = pipeline(vec![
            Arc::new(StaticFetcher {
                source: Source::Reddit,
                titles: vec!["great launch", "terrible outage"],
            }),
            Arc::new(StaticFetcher {
                source: Source::HackerNews,
                titles: vec!["Show HN: excellent tool"],
            }),
            Arc::new(StaticFetcher {
                source: Source::News,
                titles: vec!["markets", "weather", "sports"],
            }),
        ]);
        let response = p.run(&request("rust")).await.unwrap();

        assert_eq!(response.query, "rust");
        assert_eq!(response.items.len(), 3);
        assert_eq!(response.trends.len(), 3);
        for (source, expected) in [
            (Source::Reddit, 2),
            (Source::HackerNews, 1),
            (Source::News, 3),
        ] {
            assert_eq!(response.items_for(source).len(), expected);
            assert_eq!(response.trend_for(source).unwrap().frequency, expected);
        }
        assert!(response
            .items
            .values()
            .flatten()
            .all(|item| item.sentiment.is_some()));
    }

    #[tokio::test]
    async fn fetch_order_is_preserved_per_source() {
        let titles = vec!["one", "two great", "three", "four awful", "five"];
        let p = pipeline(vec![Arc::new(StaticFetcher {
            source: Source::HackerNews,
            titles: titles.clone(),
        })]);
        let response = p.run(&request("order")).await.unwrap();
        let got: Vec<_> = response
            .items_for(Source::HackerNews)
            .iter()
            .map(|i| i.title.as_str())
            .collect();
        assert_eq!(got, titles);
    }

    #[tokio::test]
    async fn failing_and_panicking_sources_degrade_to_empty() {
        let p = pipeline(vec![
            Arc::new(FailingFetcher(Source::Reddit)),
            Arc::new(PanickingFetcher(Source::HackerNews)),
            Arc::new(StaticFetcher {
                source: Source::News,
                titles: vec!["excellent results", "great growth"],
            }),
        ]);
        let response = p.run(&request("resilience")).await.unwrap();

        for source in [Source::Reddit, Source::HackerNews] {
            assert!(response.items_for(source).is_empty());
            assert_eq!(
                response.trend_for(source),
                Some(&SourceTrendSummary::default())
            );
        }
        let news = response.trend_for(Source::News).unwrap();
        assert_eq!(news.frequency, 2);
        assert_eq!(news.overall_sentiment, SentimentLabel::Positive);
        assert!(news.latest.is_some());
    }

    #[tokio::test]
    async fn missing_fetchers_still_yield_every_source_key() {
        let p = pipeline(Vec::new());
        let response = p.run(&request("nothing")).await.unwrap();
        for source in Source::ALL {
            assert!(response.items_for(source).is_empty());
            assert!(response.trend_for(source).is_some());
        }

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["reddit"], serde_json::json!([]));
        assert_eq!(json["hackernews"], serde_json::json!([]));
        assert_eq!(json["news"], serde_json::json!([]));
        assert_eq!(json["trends"]["news"]["frequency"], 0);
        assert_eq!(json["trends"]["news"]["overall_sentiment"], "Neutral");
    }

    #[tokio::test]
    async fn results_are_limited_per_source() {
        let p = pipeline(vec![Arc::new(StaticFetcher {
            source: Source::Reddit,
            titles: vec!["a", "b", "c", "d"],
        })]);
        let response = p
            .run(&EnrichRequest::new(Some("limit"), 2).unwrap())
            .await
            .unwrap();
        assert_eq!(response.items_for(Source::Reddit).len(), 2);
    }

    #[test]
    fn aggregate_summarizes_unscored_items() {
        let items = [NormalizedItem::new(Source::News, "x")];
        assert_eq!(aggregate(Source::News, &items).frequency, 1);
    }

    #[test]
    fn stage_names() {
        assert_eq!(PipelineStage::Fetching.to_string(), "fetching");
        assert_eq!(PipelineStage::Done.to_string(), "done");
    }
}
