use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Connection settings for the food impact backend.
///
/// Built once and handed to the client; nothing reads the environment after
/// construction.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    base_url: String,
    pub impact_timeout: Duration,
    pub recommendations_timeout: Duration,
    pub fallback_timeout: Duration,
    pub suggestions_timeout: Duration,
    pub debounce: Duration,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: validate_base_url(base_url)?,
            impact_timeout: Duration::from_secs(30),
            recommendations_timeout: Duration::from_secs(25),
            fallback_timeout: Duration::from_secs(10),
            suggestions_timeout: Duration::from_secs(5),
            debounce: Duration::from_millis(300),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("FOOD_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let defaults = Self::new(&base_url)?;

        Ok(Self {
            impact_timeout: secs_from_env("FOOD_API_IMPACT_TIMEOUT_SECS", defaults.impact_timeout),
            recommendations_timeout: secs_from_env(
                "FOOD_API_RECOMMENDATIONS_TIMEOUT_SECS",
                defaults.recommendations_timeout,
            ),
            fallback_timeout: secs_from_env("FOOD_API_FALLBACK_TIMEOUT_SECS", defaults.fallback_timeout),
            suggestions_timeout: secs_from_env(
                "FOOD_API_SUGGESTIONS_TIMEOUT_SECS",
                defaults.suggestions_timeout,
            ),
            debounce: env::var("FOOD_SUGGEST_DEBOUNCE_MS")
                .ok()
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
            ..defaults
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        self.base_url = validate_base_url(base_url)?;
        Ok(self)
    }

    pub fn with_impact_timeout(mut self, timeout: Duration) -> Self {
        self.impact_timeout = timeout;
        self
    }

    pub fn with_recommendations_timeout(mut self, timeout: Duration) -> Self {
        self.recommendations_timeout = timeout;
        self
    }

    pub fn with_fallback_timeout(mut self, timeout: Duration) -> Self {
        self.fallback_timeout = timeout;
        self
    }

    pub fn with_suggestions_timeout(mut self, timeout: Duration) -> Self {
        self.suggestions_timeout = timeout;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

fn secs_from_env(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn validate_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}
