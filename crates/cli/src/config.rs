//! CLI configuration: the client settings plus where to keep local state.
//!
//! # Environment Variables
//!
//! - `MERYSALUD_STATE_FILE` - JSON file holding the session and the anonymous
//!   cart (default: `.merysalud/state.json`)
//!
//! Every variable read by [`ClientConfig::from_env`] applies as well.

use std::path::PathBuf;

use merysalud_client::{ClientConfig, ConfigError};

const DEFAULT_STATE_FILE: &str = ".merysalud/state.json";

/// Configuration for one CLI invocation.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub client: ClientConfig,
    pub state_file: PathBuf,
}

impl CliConfig {
    /// Load configuration from environment variables (and `.env`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a client variable is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client = ClientConfig::from_env()?;
        let state_file = std::env::var("MERYSALUD_STATE_FILE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_STATE_FILE), PathBuf::from);
        Ok(Self { client, state_file })
    }
}
