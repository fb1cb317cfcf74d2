//! # Client Configuration
//!
//! Every section has defaults; a config file only names what it changes.
//!
//! ```json
//! {
//!   "channel":        { "prefix": "/private/" },
//!   "reconciliation": { "service": "CP", "method": "getPendingResults", "on_connect": false },
//!   "validation":     { "before_dispatch": true, "schema_path": "schema.json" }
//! }
//! ```

use rc_04_pending_tracker::TrackerConfig;
use serde::{Deserialize, Serialize};
use shared_bus::PRIVATE_CHANNEL_PREFIX;
use shared_types::{DEFAULT_RECONCILE_METHOD, DEFAULT_RECONCILE_SERVICE};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("{0}")]
    Invalid(String),
}

/// Complete client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub channel: ChannelConfig,
    pub reconciliation: ReconciliationConfig,
    pub validation: ValidationConfig,
}

/// Push channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Prefix of the session-scoped private channel.
    pub prefix: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            prefix: PRIVATE_CHANNEL_PREFIX.to_string(),
        }
    }
}

/// Reconciliation call configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    pub service: String,
    pub method: String,
    /// Reconcile each time the push subscription is (re)established.
    pub on_connect: bool,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            service: DEFAULT_RECONCILE_SERVICE.to_string(),
            method: DEFAULT_RECONCILE_METHOD.to_string(),
            on_connect: false,
        }
    }
}

/// Validation configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Reject calls whose params fail validation before sending them.
    pub before_dispatch: bool,
    /// Schema document to load when none is supplied programmatically.
    pub schema_path: Option<PathBuf>,
}

impl ClientConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Defaults with environment overrides applied.
    ///
    /// # Environment Variables
    ///
    /// - `RC_CHANNEL_PREFIX`
    /// - `RC_RECONCILE_SERVICE`, `RC_RECONCILE_METHOD`
    /// - `RC_RECONCILE_ON_CONNECT` (`true`/`1`)
    /// - `RC_VALIDATE_BEFORE_DISPATCH` (`true`/`1`)
    /// - `RC_SCHEMA_PATH`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable source on top of the current values.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(prefix) = lookup("RC_CHANNEL_PREFIX") {
            self.channel.prefix = prefix;
        }
        if let Some(service) = lookup("RC_RECONCILE_SERVICE") {
            self.reconciliation.service = service;
        }
        if let Some(method) = lookup("RC_RECONCILE_METHOD") {
            self.reconciliation.method = method;
        }
        if let Some(raw) = lookup("RC_RECONCILE_ON_CONNECT") {
            self.reconciliation.on_connect = parse_flag("RC_RECONCILE_ON_CONNECT", &raw)?;
        }
        if let Some(raw) = lookup("RC_VALIDATE_BEFORE_DISPATCH") {
            self.validation.before_dispatch = parse_flag("RC_VALIDATE_BEFORE_DISPATCH", &raw)?;
        }
        if let Some(path) = lookup("RC_SCHEMA_PATH") {
            self.validation.schema_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel.prefix.is_empty() {
            return Err(ConfigError::Invalid("channel prefix must not be empty".into()));
        }
        if self.reconciliation.service.is_empty() || self.reconciliation.method.is_empty() {
            return Err(ConfigError::Invalid(
                "reconciliation service and method must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Settings for the pending tracker.
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig::default()
            .with_channel_prefix(self.channel.prefix.clone())
            .with_reconcile_call(
                self.reconciliation.service.clone(),
                self.reconciliation.method.clone(),
            )
            .with_reconcile_on_connect(self.reconciliation.on_connect)
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}
