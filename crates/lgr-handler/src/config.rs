//! Handler configuration
//!
//! Loaded from TOML, then overridden from the environment:
//!
//! ```toml
//! region = "us-east-1"
//! account_number = "123456789012"
//! max_name_chars = 255
//! retry_callback_secs = 60
//! ```

use lgr_core::{DeploymentContext, DEFAULT_MAX_NAME_CHARS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding the region
pub const ENV_REGION: &str = "LGR_REGION";

/// Environment variable overriding the account number
pub const ENV_ACCOUNT_NUMBER: &str = "LGR_ACCOUNT_NUMBER";

/// Default callback hint for retryable failures
pub const DEFAULT_RETRY_CALLBACK_SECS: u64 = 60;

/// Handler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Region code
    pub region: String,
    /// Account number
    pub account_number: String,
    /// Longest default name derived from naming coordinates
    pub max_name_chars: usize,
    /// Callback hint attached to retryable failures
    pub retry_callback_secs: u64,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            region: String::new(),
            account_number: String::new(),
            max_name_chars: DEFAULT_MAX_NAME_CHARS,
            retry_callback_secs: DEFAULT_RETRY_CALLBACK_SECS,
        }
    }
}

impl HandlerConfig {
    /// Set region
    #[inline]
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set account number
    #[inline]
    #[must_use]
    pub fn with_account_number(mut self, account_number: impl Into<String>) -> Self {
        self.account_number = account_number.into();
        self
    }

    /// Set name length limit
    #[inline]
    #[must_use]
    pub fn with_max_name_chars(mut self, max_name_chars: usize) -> Self {
        self.max_name_chars = max_name_chars;
        self
    }

    /// Set retry callback hint
    #[inline]
    #[must_use]
    pub fn with_retry_callback_secs(mut self, secs: u64) -> Self {
        self.retry_callback_secs = secs;
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidToml` on malformed input
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply overrides from a variable lookup; empty values are ignored
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());
        if let Some(region) = non_empty(ENV_REGION) {
            self.region = region;
        }
        if let Some(account_number) = non_empty(ENV_ACCOUNT_NUMBER) {
            self.account_number = account_number;
        }
        self
    }

    /// Apply overrides from the process environment
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Check required fields
    ///
    /// # Errors
    /// Returns `ConfigError::Missing` or `ConfigError::Invalid`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::Missing("region"));
        }
        if self.account_number.trim().is_empty() {
            return Err(ConfigError::Missing("account_number"));
        }
        if self.max_name_chars < MIN_NAME_CHARS {
            return Err(ConfigError::Invalid(format!(
                "max_name_chars must be at least {MIN_NAME_CHARS}, got {}",
                self.max_name_chars
            )));
        }
        Ok(())
    }

    /// Deployment context for identifier formatting
    #[inline]
    #[must_use]
    pub fn deployment(&self) -> DeploymentContext {
        DeploymentContext::new(&self.region, &self.account_number)
    }
}

/// Truncated names keep a short prefix plus the digest suffix
const MIN_NAME_CHARS: usize = 16;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path that was read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for [`HandlerConfig`]
    #[error("invalid TOML: {0}")]
    InvalidToml(#[from] toml::de::Error),

    /// Required setting is empty
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    /// Setting is out of range
    #[error("invalid setting: {0}")]
    Invalid(String),
}
