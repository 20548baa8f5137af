use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "TRENDPULSE_ENV"));
}

#[test]
fn empty_environment_uses_defaults() {
    let map = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.default_limit, 20);
    assert_eq!(cfg.max_limit, 100);
    assert_eq!(cfg.scorer, ScorerBackend::Lexicon);
    assert_eq!(cfg.score_timeout_ms, 2000);
    assert_eq!(cfg.enrich_max_concurrency, 16);
    assert_eq!(cfg.source_timeout_secs, 5);
    assert_eq!(cfg.source_max_retries, 1);
    assert_eq!(cfg.source_backoff_base_ms, 500);
    assert_eq!(cfg.user_agent, "trendpulse/0.1 (trend-enrichment)");
    assert!(cfg.api_keys.is_empty());
    assert_eq!(cfg.rate_limit_requests, 120);
    assert_eq!(cfg.rate_limit_window_secs, 60);
    assert!(cfg.reddit_client_id.is_none());
    assert!(cfg.newsapi_api_key.is_none());
    assert_eq!(cfg.hn_api_url, "https://hn.algolia.com/api/v1");
}

#[test]
fn scorer_backend_is_case_insensitive() {
    let mut map = HashMap::new();
    map.insert("TRENDPULSE_SCORER", "Negation");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.scorer, ScorerBackend::Negation);
}

#[test]
fn unknown_scorer_backend_fails() {
    let mut map = HashMap::new();
    map.insert("TRENDPULSE_SCORER", "vader");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TRENDPULSE_SCORER"),
        "expected InvalidEnvVar(TRENDPULSE_SCORER), got: {result:?}"
    );
}

#[test]
fn remote_scorer_requires_url() {
    let mut map = HashMap::new();
    map.insert("TRENDPULSE_SCORER", "remote");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "TRENDPULSE_SCORER_URL"),
        "expected MissingEnvVar(TRENDPULSE_SCORER_URL), got: {result:?}"
    );

    map.insert("TRENDPULSE_SCORER_URL", "http://localhost:8080");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.scorer, ScorerBackend::Remote);
    assert_eq!(cfg.scorer_url.as_deref(), Some("http://localhost:8080"));
}

#[test]
fn zero_concurrency_is_rejected() {
    let mut map = HashMap::new();
    map.insert("TRENDPULSE_ENRICH_MAX_CONCURRENCY", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TRENDPULSE_ENRICH_MAX_CONCURRENCY"),
        "expected InvalidEnvVar(TRENDPULSE_ENRICH_MAX_CONCURRENCY), got: {result:?}"
    );
}

#[test]
fn default_limit_above_max_is_rejected() {
    let mut map = HashMap::new();
    map.insert("TRENDPULSE_DEFAULT_LIMIT", "50");
    map.insert("TRENDPULSE_MAX_LIMIT", "10");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TRENDPULSE_DEFAULT_LIMIT"),
        "expected InvalidEnvVar(TRENDPULSE_DEFAULT_LIMIT), got: {result:?}"
    );
}

#[test]
fn source_timeout_invalid() {
    let mut map = HashMap::new();
    map.insert("TRENDPULSE_SOURCE_TIMEOUT_SECS", "not-a-number");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TRENDPULSE_SOURCE_TIMEOUT_SECS"),
        "expected InvalidEnvVar(TRENDPULSE_SOURCE_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn blank_credentials_count_as_missing() {
    let mut map = HashMap::new();
    map.insert("REDDIT_CLIENT_ID", "   ");
    map.insert("NEWSAPI_API_KEY", "");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.reddit_client_id.is_none());
    assert!(cfg.newsapi_api_key.is_none());
}

#[test]
fn debug_output_redacts_secrets() {
    let mut map = HashMap::new();
    map.insert("REDDIT_CLIENT_SECRET", "super-secret");
    map.insert("NEWSAPI_API_KEY", "news-key-123");
    map.insert("TRENDPULSE_API_KEYS", "bearer-one,bearer-two");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let debug = format!("{cfg:?}");
    assert!(!debug.contains("super-secret"));
    assert!(!debug.contains("news-key-123"));
    assert!(!debug.contains("bearer-one"));
    assert!(debug.contains("[2 redacted]"));
    assert!(debug.contains("[redacted]"));
}

#[test]
fn normalize_limit_applies_defaults_and_bounds() {
    let map = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.normalize_limit(None), 20);
    assert_eq!(cfg.normalize_limit(Some(0)), 1);
    assert_eq!(cfg.normalize_limit(Some(1_000)), 100);
    assert_eq!(cfg.normalize_limit(Some(7)), 7);
}

#[test]
fn api_keys_are_split_trimmed_and_deduplicated() {
    let mut map = HashMap::new();
    map.insert("TRENDPULSE_API_KEYS", " beta, alpha ,,beta, ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.api_keys, ["alpha", "beta"]);
}

#[test]
fn blank_api_keys_are_empty() {
    let mut map = HashMap::new();
    map.insert("TRENDPULSE_API_KEYS", " , ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.api_keys.is_empty());
}

#[test]
fn zero_rate_limit_window_is_rejected() {
    let mut map = HashMap::new();
    map.insert("TRENDPULSE_RATE_LIMIT_WINDOW_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TRENDPULSE_RATE_LIMIT_WINDOW_SECS"),
        "expected InvalidEnvVar(TRENDPULSE_RATE_LIMIT_WINDOW_SECS), got: {result:?}"
    );
}
