//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `MERYSALUD_API_BASE_URL` - Backend REST base URL (default: `http://localhost:8080/api`)
//! - `MERYSALUD_TIMEOUT_SECS` - Network timeout per request (default: 30)
//! - `MERYSALUD_PRODUCT_CACHE_TTL_SECS` - Product detail cache lifetime (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

const DEFAULT_TIMEOUT_SECS: &str = "30";
const DEFAULT_CACHE_TTL_SECS: &str = "300";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, always ending in `/`
    pub base_url: Url,
    /// Network timeout per request
    pub timeout: Duration,
    /// Lifetime of cached product details
    pub product_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable is set but cannot be
    /// parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = get_env_or_default("MERYSALUD_API_BASE_URL", DEFAULT_BASE_URL);
        let base_url = normalize_base_url(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("MERYSALUD_API_BASE_URL".to_string(), e)
        })?;
        let timeout = get_secs("MERYSALUD_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let product_cache_ttl =
            get_secs("MERYSALUD_PRODUCT_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            base_url,
            timeout,
            product_cache_ttl,
            sentry_dsn,
        })
    }

    /// Configuration pointing at a specific backend, with default timings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not an absolute
    /// http(s) URL.
    pub fn with_base_url(base_url: &str) -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("MERYSALUD_API_BASE_URL".to_string(), e)
        })?;
        Ok(Self {
            base_url,
            timeout: Duration::from_secs(30),
            product_cache_ttl: Duration::from_secs(300),
            sentry_dsn: None,
        })
    }
}

/// Parse a base URL and make sure it ends with `/` so relative joins keep
/// the `/api` prefix.
fn normalize_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a whole number of seconds, rejecting zero.
fn get_secs(key: &str, default: &str) -> Result<Duration, ConfigError> {
    let secs = get_env_or_default(key, default)
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url_has_default_timings() {
        let config = ClientConfig::with_base_url(DEFAULT_BASE_URL).unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8080/api/");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.product_cache_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = ClientConfig::with_base_url("https://farmacia.example.pe/api").unwrap();
        assert_eq!(config.base_url.as_str(), "https://farmacia.example.pe/api/");
        assert_eq!(
            config.base_url.join("cart/add").unwrap().as_str(),
            "https://farmacia.example.pe/api/cart/add"
        );
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        assert!(matches!(
            ClientConfig::with_base_url("ftp://farmacia.example.pe"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(ClientConfig::with_base_url("not a url").is_err());
    }
}
