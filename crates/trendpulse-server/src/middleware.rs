use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use trendpulse_core::{AppConfig, Environment};
use uuid::Uuid;

use crate::api::ApiError;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request ID carried as a request extension for handlers and rejections.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer keys accepted on the enrich routes. An empty set means auth is off.
#[derive(Debug, Clone)]
pub struct AuthState {
    api_keys: Arc<HashSet<String>>,
}

impl AuthState {
    /// Builds auth from `AppConfig::api_keys`.
    ///
    /// # Errors
    ///
    /// Fails when no keys are configured outside development.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Self::new(
            config.api_keys.iter().cloned(),
            config.env == Environment::Development,
        )
    }

    fn new(
        keys: impl IntoIterator<Item = String>,
        is_development: bool,
    ) -> anyhow::Result<Self> {
        let api_keys: HashSet<String> = keys.into_iter().collect();
        if api_keys.is_empty() {
            anyhow::ensure!(
                is_development,
                "TRENDPULSE_API_KEYS is required outside development"
            );
            tracing::warn!("no API keys configured; enrich routes are open in development");
        }
        Ok(Self {
            api_keys: Arc::new(api_keys),
        })
    }

    /// Auth that lets every request through.
    #[cfg(test)]
    pub fn disabled() -> Self {
        Self {
            api_keys: Arc::new(HashSet::new()),
        }
    }

    pub fn enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }

    fn allows(&self, token: &str) -> bool {
        self.api_keys.contains(token)
    }
}

/// Fixed-window limiter shared by every request to the enrich routes.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    current: Arc<Mutex<(Instant, usize)>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            current: Arc::new(Mutex::new((Instant::now(), 0))),
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.rate_limit_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        )
    }

    /// Counts one request against the current window; `false` once it is full.
    async fn admit(&self) -> bool {
        let mut current = self.current.lock().await;
        let (started_at, count) = &mut *current;
        if started_at.elapsed() >= self.window {
            *started_at = Instant::now();
            *count = 0;
        }
        if *count >= self.max_requests {
            return false;
        }
        *count += 1;
        true
    }
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

/// Reuses a non-blank `x-request-id` header or generates a `UUIDv4`, then
/// echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut res = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(X_REQUEST_ID, val);
    }
    res
}

pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled() {
        return next.run(req).await;
    }
    match bearer_token(req.headers().get(AUTHORIZATION)) {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => ApiError::new(
            request_id_of(&req),
            "unauthorized",
            "missing or invalid bearer token",
        )
        .into_response(),
    }
}

pub async fn enforce_rate_limit(
    State(limiter): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    if limiter.admit().await {
        return next.run(req).await;
    }
    tracing::warn!(path = %req.uri().path(), "rate limit exceeded");
    ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded").into_response()
}

fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
