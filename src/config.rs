//! Sidecar configuration parsing and validation.
//!
//! Settings come from an optional TOML file plus CLI overrides applied by
//! the binary. Every field has a default, so an absent config file yields
//! a fully usable configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// Default inference-server endpoint.
pub const DEFAULT_SERVER_ADDR: &str = "tcp://127.0.0.1:5555";

fn default_server_addr() -> String {
    DEFAULT_SERVER_ADDR.to_owned()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_line_bytes() -> usize {
    // Command lines carry base64-encoded screenshots.
    16 * 1_048_576
}

/// Sidecar settings parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    /// `ZeroMQ` endpoint of the inference server.
    #[serde(default = "default_server_addr")]
    pub server_addr: String,
    /// Send/receive timeout for one request/reply exchange, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum accepted length of one stdin command line, in bytes.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: default_server_addr(),
            timeout_ms: default_timeout_ms(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

impl Settings {
    /// Load and validate settings from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse settings from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let settings: Self = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Exchange timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate the settings, whatever their source.
    ///
    /// Parsing runs this automatically; callers that mutate settings after
    /// parsing (CLI overrides) must re-run it themselves.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.server_addr.is_empty() {
            return Err(AppError::Config("server_addr must not be empty".into()));
        }
        if self.timeout_ms == 0 {
            return Err(AppError::Config(
                "timeout_ms must be greater than zero".into(),
            ));
        }
        if self.max_line_bytes == 0 {
            return Err(AppError::Config(
                "max_line_bytes must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
