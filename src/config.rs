//! Client configuration
//!
//! Backend location and request timeout, read from the environment.

use std::time::Duration;

use thiserror::Error;

pub const API_URL_VAR: &str = "NUTRIVIEW_API_URL";
pub const REQUEST_TIMEOUT_VAR: &str = "NUTRIVIEW_REQUEST_TIMEOUT_SECS";

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be an http(s) URL, got `{value}`")]
    InvalidUrl { var: &'static str, value: String },

    #[error("{var} must be a positive number of seconds, got `{value}`")]
    InvalidTimeout { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL without trailing slash
    pub api_url: String,
    /// Client-side limit for every backend call
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Read from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary lookup, unset keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = match lookup(API_URL_VAR) {
            Some(raw) => normalize_api_url(&raw)?,
            None => DEFAULT_API_URL.to_string(),
        };

        let request_timeout = match lookup(REQUEST_TIMEOUT_VAR) {
            Some(raw) => parse_timeout_secs(&raw)?,
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            api_url,
            request_timeout,
        })
    }

    /// Apply command line overrides on top of the environment
    pub fn with_overrides(
        mut self,
        api_url: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = api_url {
            self.api_url = normalize_api_url(url)?;
        }
        if let Some(secs) = timeout_secs {
            self.request_timeout = parse_timeout_secs(&secs.to_string())?;
        }
        Ok(self)
    }
}

fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidUrl {
            var: API_URL_VAR,
            value: raw.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn parse_timeout_secs(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout {
            var: REQUEST_TIMEOUT_VAR,
            value: raw.to_string(),
        }),
    }
}
