use crate::app_config::{AppConfig, Environment, ScorerBackend};
use crate::ConfigError;

const DEFAULT_REDDIT_AUTH_URL: &str = "https://www.reddit.com";
const DEFAULT_REDDIT_API_URL: &str = "https://oauth.reddit.com";
const DEFAULT_HN_API_URL: &str = "https://hn.algolia.com/api/v1";
const DEFAULT_NEWSAPI_URL: &str = "https://newsapi.org/v2";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the real environment so tests can
/// drive them with a plain `HashMap`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for unparseable or inconsistent
/// values and [`ConfigError::MissingEnvVar`] when the remote scorer is
/// selected without `TRENDPULSE_SCORER_URL`.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Blank values count as unset so `FOO=` in a .env file behaves like a missing var.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be at least 1".to_string()));
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("TRENDPULSE_ENV", "development"))?;

    let bind_addr = or_default("TRENDPULSE_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("TRENDPULSE_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("TRENDPULSE_LOG_LEVEL", "info");

    let default_limit = parse_positive("TRENDPULSE_DEFAULT_LIMIT", "20")?;
    let max_limit = parse_positive("TRENDPULSE_MAX_LIMIT", "100")?;
    if default_limit > max_limit {
        return Err(invalid(
            "TRENDPULSE_DEFAULT_LIMIT",
            format!("{default_limit} exceeds TRENDPULSE_MAX_LIMIT ({max_limit})"),
        ));
    }

    let scorer = parse_scorer_backend(&or_default("TRENDPULSE_SCORER", "lexicon"))?;
    let scorer_url = optional("TRENDPULSE_SCORER_URL");
    if scorer == ScorerBackend::Remote && scorer_url.is_none() {
        return Err(ConfigError::MissingEnvVar(
            "TRENDPULSE_SCORER_URL".to_string(),
        ));
    }
    let score_timeout_ms = parse_u64("TRENDPULSE_SCORE_TIMEOUT_MS", "2000")?;
    let enrich_max_concurrency = parse_positive("TRENDPULSE_ENRICH_MAX_CONCURRENCY", "16")?;

    let source_timeout_secs = parse_u64("TRENDPULSE_SOURCE_TIMEOUT_SECS", "5")?;
    let source_max_retries = parse_u32("TRENDPULSE_SOURCE_MAX_RETRIES", "1")?;
    let source_backoff_base_ms = parse_u64("TRENDPULSE_SOURCE_BACKOFF_BASE_MS", "500")?;
    let user_agent = or_default("TRENDPULSE_USER_AGENT", "trendpulse/0.1 (trend-enrichment)");

    let api_keys = parse_api_keys(&or_default("TRENDPULSE_API_KEYS", ""));
    let rate_limit_requests = parse_positive("TRENDPULSE_RATE_LIMIT_REQUESTS", "120")?;
    let rate_limit_window_secs = parse_u64("TRENDPULSE_RATE_LIMIT_WINDOW_SECS", "60")?;
    if rate_limit_window_secs == 0 {
        return Err(invalid(
            "TRENDPULSE_RATE_LIMIT_WINDOW_SECS",
            "must be at least 1".to_string(),
        ));
    }

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        default_limit,
        max_limit,
        scorer,
        scorer_url,
        score_timeout_ms,
        enrich_max_concurrency,
        source_timeout_secs,
        source_max_retries,
        source_backoff_base_ms,
        user_agent,
        api_keys,
        rate_limit_requests,
        rate_limit_window_secs,
        reddit_client_id: optional("REDDIT_CLIENT_ID"),
        reddit_client_secret: optional("REDDIT_CLIENT_SECRET"),
        newsapi_api_key: optional("NEWSAPI_API_KEY"),
        reddit_auth_url: or_default("TRENDPULSE_REDDIT_AUTH_URL", DEFAULT_REDDIT_AUTH_URL),
        reddit_api_url: or_default("TRENDPULSE_REDDIT_API_URL", DEFAULT_REDDIT_API_URL),
        hn_api_url: or_default("TRENDPULSE_HN_API_URL", DEFAULT_HN_API_URL),
        newsapi_url: or_default("TRENDPULSE_NEWSAPI_URL", DEFAULT_NEWSAPI_URL),
    })
}

/// Comma-separated list; blank entries are dropped and duplicates collapse.
fn parse_api_keys(raw: &str) -> Vec<String> {
    let mut keys: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TRENDPULSE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_scorer_backend(s: &str) -> Result<ScorerBackend, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "lexicon" => Ok(ScorerBackend::Lexicon),
        "negation" => Ok(ScorerBackend::Negation),
        "remote" => Ok(ScorerBackend::Remote),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TRENDPULSE_SCORER".to_string(),
            reason: format!("unknown scorer backend '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
