//! Client configuration and process-wide defaults.
//!
//! # Design
//! The API key is resolved in order: explicit `ClientConfig::api_key`, the
//! process-wide default set with `set_default_api_key`, then the
//! `MAILCHIMP_API_KEY` environment variable. The timeout falls back to the
//! process-wide default, which starts at five seconds.

use std::env;
use std::sync::RwLock;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::{ChimpError, Result};

pub const API_KEY_ENV: &str = "MAILCHIMP_API_KEY";
pub const DEFAULT_DOMAIN: &str = "mailchimp.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
struct Defaults {
    api_key: Option<String>,
    timeout: Duration,
}

static DEFAULTS: Lazy<RwLock<Defaults>> = Lazy::new(|| {
    RwLock::new(Defaults {
        api_key: None,
        timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    })
});

/// Set the API key used by clients that are not given one explicitly.
pub fn set_default_api_key(key: Option<String>) {
    DEFAULTS.write().unwrap_or_else(|e| e.into_inner()).api_key = key;
}

/// Set the timeout used by clients that are not given one explicitly.
pub fn set_default_timeout(timeout: Duration) {
    DEFAULTS.write().unwrap_or_else(|e| e.into_inner()).timeout = timeout;
}

pub fn default_api_key() -> Option<String> {
    DEFAULTS.read().unwrap_or_else(|e| e.into_inner()).api_key.clone()
}

pub fn default_timeout() -> Duration {
    DEFAULTS.read().unwrap_or_else(|e| e.into_inner()).timeout
}

/// Settings for one `Client`.
///
/// Deserializes from `{ "apiKey": "...", "timeoutSeconds": 2.5 }`; every
/// field is optional. Fractional seconds are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    pub timeout_seconds: Option<f64>,
    /// Service domain; hosts are `<region>.api.<domain>`.
    pub domain: Option<String>,
    /// Full base URL replacing the region-derived host, e.g. a mock server.
    pub endpoint: Option<String>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn timeout_seconds(mut self, secs: f64) -> Self {
        self.timeout_seconds = Some(secs);
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_api_key(self.api_key.clone(), default_api_key(), env::var(API_KEY_ENV).ok())
    }

    /// The configured timeout, or the process default. Zero, negative and
    /// non-finite values are rejected.
    pub fn resolved_timeout(&self) -> Result<Duration> {
        let Some(secs) = self.timeout_seconds else {
            return Ok(default_timeout());
        };
        Duration::try_from_secs_f64(secs)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| ChimpError::InvalidConfig(format!("timeoutSeconds must be positive, got {secs}")))
    }

    pub fn resolved_domain(&self) -> &str {
        self.domain.as_deref().unwrap_or(DEFAULT_DOMAIN)
    }
}

fn resolve_api_key(
    explicit: Option<String>,
    default: Option<String>,
    from_env: Option<String>,
) -> Option<String> {
    explicit.or(default).or(from_env)
}
