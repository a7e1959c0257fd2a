use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::poller::PollOptions;
use crate::session::TOKEN_KEY;

/// Compiled-in default, overridable at runtime through the same variable.
const DEFAULT_API_URL: &str = match option_env!("NEUROSCREEN_API_URL") {
    Some(url) => url,
    None => "http://localhost:5000",
};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not a valid API URL ({value:?}): {reason}")]
    InvalidUrl {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("could not determine a data directory, set NEUROSCREEN_DATA_DIR")]
    NoDataDir,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: Url,
    /// Where the session credential is persisted.
    pub data_dir: PathBuf,
    pub poll: PollOptions,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_base_url: Url, data_dir: PathBuf) -> Self {
        Self {
            api_base_url,
            data_dir,
            poll: PollOptions::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Reads `.env` (if any) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup("NEUROSCREEN_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_base_url = parse_api_url("NEUROSCREEN_API_URL", &raw_url)?;

        let data_dir = match lookup("NEUROSCREEN_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .map(|dir| dir.join("neuroscreen"))
                .ok_or(ConfigError::NoDataDir)?,
        };

        let defaults = PollOptions::default();
        let interval_ms = parse_positive(
            "NEUROSCREEN_POLL_INTERVAL_MS",
            &lookup,
            defaults.interval.as_millis() as u64,
        )?;
        let max_retries =
            parse_positive("NEUROSCREEN_POLL_MAX_RETRIES", &lookup, defaults.max_retries)?;
        let timeout_secs = parse_positive(
            "NEUROSCREEN_REQUEST_TIMEOUT_SECS",
            &lookup,
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        Ok(Self {
            api_base_url,
            data_dir,
            poll: PollOptions {
                max_retries,
                interval: Duration::from_millis(interval_ms),
            },
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn credential_path(&self) -> PathBuf {
        self.data_dir.join(TOKEN_KEY)
    }
}

fn parse_api_url(var: &'static str, value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        var,
        value: value.to_string(),
        reason,
    };

    let url = Url::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme `{}`", other))),
    }
}

fn parse_positive<T, F>(var: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };

    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(ConfigError::InvalidNumber { var, value: raw }),
    }
}
