use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use trendpulse_enrich::{EnrichRequest, EnrichResponse, PipelineError};

use crate::middleware::RequestId;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct EnrichQuery {
    pub query: Option<String>,
    /// Kept as text so a malformed value gets our error envelope, not
    /// axum's plain-text rejection.
    pub limit: Option<String>,
}

/// `GET /enrich?query=..&limit=..`
///
/// Success returns the bare envelope (`query`, `trends`, one array per
/// source) rather than the `data`/`meta` wrapper, so existing dashboard
/// clients read it unchanged.
pub(super) async fn enrich(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<EnrichQuery>,
) -> Result<Json<EnrichResponse>, ApiError> {
    let limit = parse_limit(params.limit.as_deref())
        .map_err(|message| ApiError::new(req_id.0.clone(), "validation_error", message))?;
    let limit = state.config.normalize_limit(limit);

    let request = EnrichRequest::new(params.query.as_deref(), limit)
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    let response = state
        .pipeline
        .run(&request)
        .await
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    Ok(Json(response))
}

fn parse_limit(raw: Option<&str>) -> Result<Option<usize>, &'static str> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<usize>()
            .map(Some)
            .map_err(|_| "'limit' must be a non-negative integer"),
    }
}

pub(super) fn map_pipeline_error(request_id: String, error: &PipelineError) -> ApiError {
    match error {
        PipelineError::MissingQuery => {
            tracing::warn!(request_id = %request_id, "rejected request without query");
            ApiError::new(request_id, "bad_request", "Missing 'query' parameter")
        }
        PipelineError::Internal(_) => {
            tracing::error!(request_id = %request_id, error = %error, "enrich request failed");
            ApiError::new(request_id, "internal_error", "Internal server error")
        }
    }
}
