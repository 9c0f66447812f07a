//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use url::Url;

/// Address an Android emulator uses to reach the host machine's loopback.
pub const ANDROID_EMULATOR_HOST: &str = "10.0.2.2";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// The platform the client runs on, which affects base URL resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Native,
    Android,
    Ios,
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" | "desktop" | "web" => Ok(Platform::Native),
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            other => Err(format!("'{}' is not a known platform", other)),
        }
    }
}

/// Retry policy for idempotent reads that fail before a response arrives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: Url,
    pub data_dir: PathBuf,
    pub log_level: Level,
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Resolve the API origin ---
        let override_url = std::env::var("WEAVE_API_URL").ok();
        let dev_host = std::env::var("WEAVE_DEV_HOST").unwrap_or_else(|_| "localhost".to_string());
        let port = parse_var("WEAVE_API_PORT", 8000u16)?;
        let platform_str =
            std::env::var("WEAVE_PLATFORM").unwrap_or_else(|_| "native".to_string());
        let platform = platform_str
            .parse::<Platform>()
            .map_err(|e| ConfigError::InvalidValue("WEAVE_PLATFORM".to_string(), e))?;
        let base_url = resolve_base_url(override_url.as_deref(), &dev_host, port, platform)?;

        // --- Local state and logging ---
        let data_dir = std::env::var("WEAVE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.weave"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Transport policy ---
        let request_timeout = Duration::from_millis(parse_var("WEAVE_TIMEOUT_MS", 10_000u64)?);
        let max_attempts = parse_var("WEAVE_RETRY_MAX_ATTEMPTS", 3u32)?.max(1);
        let base_delay = Duration::from_millis(parse_var("WEAVE_RETRY_DELAY_MS", 1000u64)?);

        Ok(Self {
            base_url,
            data_dir,
            log_level,
            request_timeout,
            retry: RetryConfig {
                max_attempts,
                base_delay,
            },
        })
    }

    /// A config pointing at `base_url` with default policies, for tests and embedding.
    pub fn for_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("base_url", base_url)?,
            data_dir: PathBuf::from("./.weave"),
            log_level: Level::INFO,
            request_timeout: Duration::from_millis(10_000),
            retry: RetryConfig::default(),
        })
    }
}

/// Picks the API origin.
///
/// An explicit override always wins. Otherwise the development host and port
/// are combined, and on Android a loopback host is swapped for the address
/// the emulator uses to reach the host machine.
pub fn resolve_base_url(
    override_url: Option<&str>,
    dev_host: &str,
    port: u16,
    platform: Platform,
) -> Result<Url, ConfigError> {
    if let Some(url) = override_url.filter(|u| !u.trim().is_empty()) {
        return parse_base_url("WEAVE_API_URL", url);
    }

    let host = match platform {
        Platform::Android if is_loopback_host(dev_host) => ANDROID_EMULATOR_HOST,
        _ => dev_host,
    };
    parse_base_url("WEAVE_DEV_HOST", &format!("http://{}:{}", host, port))
}

fn is_loopback_host(host: &str) -> bool {
    host.eq_ignore_ascii_case("localhost")
        || host == "::1"
        || host == "[::1]"
        || host.starts_with("127.")
}

fn parse_base_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    Url::parse(trimmed).map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string()))
}

fn parse_var<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
