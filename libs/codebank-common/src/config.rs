//! Environment configuration
//!
//! Loaded once at startup. A `.env` file in the working directory is honored.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_LANGUAGES_CONFIG: &str = "config/languages.json";
pub const DEFAULT_EXECUTION_TIMEOUT_MS: u64 = 10_000;

/// What happens when submitted code raises at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeErrorPolicy {
    /// The error message is printed as program output and graded like any other output
    #[default]
    Lenient,
    /// The error fails the execution
    Strict,
}

impl FromStr for RuntimeErrorPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            _ => Err(ConfigError::InvalidValue("RUNTIME_ERROR_POLICY".to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub redis_url: Option<String>,
    pub languages_config: PathBuf,
    /// `None` disables the wall-clock limit
    pub execution_timeout_ms: Option<u64>,
    pub runtime_error_policy: RuntimeErrorPolicy,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            redis_url: None,
            languages_config: PathBuf::from(DEFAULT_LANGUAGES_CONFIG),
            execution_timeout_ms: Some(DEFAULT_EXECUTION_TIMEOUT_MS),
            runtime_error_policy: RuntimeErrorPolicy::default(),
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let server_port = match lookup("SERVER_PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".to_string()))?,
            None => defaults.server_port,
        };

        let execution_timeout_ms = match lookup("EXECUTION_TIMEOUT_MS") {
            Some(raw) => {
                let ms: u64 = raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("EXECUTION_TIMEOUT_MS".to_string()))?;
                (ms > 0).then_some(ms)
            }
            None => defaults.execution_timeout_ms,
        };

        let runtime_error_policy = match lookup("RUNTIME_ERROR_POLICY") {
            Some(raw) => raw.parse()?,
            None => defaults.runtime_error_policy,
        };

        Ok(Self {
            server_host: lookup("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port,
            redis_url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),
            languages_config: lookup("LANGUAGES_CONFIG")
                .map(PathBuf::from)
                .unwrap_or(defaults.languages_config),
            execution_timeout_ms,
            runtime_error_policy,
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}
