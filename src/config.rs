use std::env;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://api.afftok.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(100);

/// Advertiser credentials and API location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub advertiser_id: String,
    pub base_url: String,
}

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        advertiser_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            advertiser_id: advertiser_id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Sender configuration, read once at process start
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub credentials: Credentials,
    /// Applies to every outbound request.
    pub timeout: Duration,
    /// Pause after each item of a batch.
    pub batch_delay: Duration,
}

impl TrackerConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            timeout: DEFAULT_TIMEOUT,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }

    /// Read `API_KEY`, `ADVERTISER_ID`, `BASE_URL`, `REQUEST_TIMEOUT_SECS`
    /// and `BATCH_DELAY_MS` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) but with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get("API_KEY").ok_or(ConfigError::Missing("API_KEY"))?;
        let advertiser_id = get("ADVERTISER_ID").ok_or(ConfigError::Missing("ADVERTISER_ID"))?;
        let base_url = get("BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("REQUEST_TIMEOUT_SECS", raw)?),
            None => DEFAULT_TIMEOUT,
        };
        let batch_delay = match get("BATCH_DELAY_MS") {
            Some(raw) => Duration::from_millis(parse_number("BATCH_DELAY_MS", raw)?),
            None => DEFAULT_BATCH_DELAY,
        };

        Ok(Self {
            credentials: Credentials::new(api_key, advertiser_id, base_url),
            timeout,
            batch_delay,
        })
    }
}

fn parse_number(name: &'static str, raw: String) -> Result<u64, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value: raw })
}
