use std::env;
use std::time::Duration;

use tracing::info;

/// Which implementation backs every source adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    /// Deterministic series, no network.
    #[default]
    Synthetic,
    /// Provider APIs where a key is configured, synthetic otherwise.
    Live,
}

impl SourceMode {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "live" => SourceMode::Live,
            _ => SourceMode::Synthetic,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Completion service
    pub openai_api_key: Option<String>,
    pub openai_model: String,

    // Source providers
    pub source_mode: SourceMode,
    pub serpapi_api_key: Option<String>,
    pub producthunt_token: Option<String>,
    pub youtube_api_key: Option<String>,
    pub reddit_live: bool,
    pub source_timeout: Duration,
    pub synthetic_items: usize,

    // Storage
    pub database_url: Option<String>,

    // Guards
    pub cache_ttl: Duration,
    pub rate_limit_window: Duration,
    pub rate_limit_max: u32,

    // Web server
    pub api_host: String,
    pub api_port: u16,
    pub expose_internal_errors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            source_mode: SourceMode::Synthetic,
            serpapi_api_key: None,
            producthunt_token: None,
            youtube_api_key: None,
            reddit_live: false,
            source_timeout: Duration::from_millis(5_000),
            synthetic_items: 6,
            database_url: None,
            cache_ttl: Duration::from_secs(6 * 60 * 60),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 10,
            api_host: "0.0.0.0".to_string(),
            api_port: 3000,
            expose_internal_errors: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    /// A `.env` file in the working directory (or a parent) is read first;
    /// variables already set in the process win over it.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Ok(Self {
            openai_api_key: optional_env("OPENAI_API_KEY"),
            openai_model: env::var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            source_mode: optional_env("SOURCE_MODE")
                .map(|s| SourceMode::parse(&s))
                .unwrap_or_default(),
            serpapi_api_key: optional_env("SERPAPI_API_KEY"),
            producthunt_token: optional_env("PRODUCTHUNT_TOKEN"),
            youtube_api_key: optional_env("YOUTUBE_API_KEY"),
            reddit_live: parse_bool("REDDIT_LIVE"),
            source_timeout: Duration::from_millis(parse_env("SOURCE_TIMEOUT_MS", 5_000)?),
            synthetic_items: parse_env("SYNTHETIC_ITEMS", defaults.synthetic_items)?,
            database_url: optional_env("DATABASE_URL"),
            cache_ttl: Duration::from_secs(parse_env("CACHE_TTL_SECS", 6 * 60 * 60)?),
            rate_limit_window: Duration::from_secs(parse_env("RATE_LIMIT_WINDOW_SECS", 60)?),
            rate_limit_max: parse_env("RATE_LIMIT_MAX", defaults.rate_limit_max)?,
            api_host: env::var("API_HOST").unwrap_or(defaults.api_host),
            api_port: parse_env("API_PORT", defaults.api_port)?,
            expose_internal_errors: parse_bool("EXPOSE_INTERNAL_ERRORS"),
        })
    }

    /// Log which integrations are configured without printing secrets.
    pub fn log_redacted(&self) {
        info!(
            openai = self.openai_api_key.is_some(),
            model = self.openai_model.as_str(),
            source_mode = ?self.source_mode,
            serpapi = self.serpapi_api_key.is_some(),
            producthunt = self.producthunt_token.is_some(),
            youtube = self.youtube_api_key.is_some(),
            reddit_live = self.reddit_live,
            postgres = self.database_url.is_some(),
            source_timeout_ms = self.source_timeout.as_millis() as u64,
            cache_ttl_secs = self.cache_ttl.as_secs(),
            rate_limit_max = self.rate_limit_max,
            "Loaded config"
        );
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(key: &str) -> bool {
    optional_env(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} must be a valid number: {e}")),
        None => Ok(default),
    }
}
