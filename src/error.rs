//! Error types for the injection guard.
//!
//! Startup problems are [`ConfigurationError`] and stop the process. A single
//! failed backend call is a [`DetectionFailure`]; the dispatcher wraps it into
//! a [`DispatchError`] before it reaches the HTTP layer.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Fatal startup errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// Provider identifier is not in the supported set.
    #[error("Unknown provider '{name}', expected one of: {supported}")]
    UnknownProvider { name: String, supported: String },

    /// A credential the selected provider needs was not configured.
    #[error("Missing credential for {provider}: {what}")]
    MissingCredential {
        provider: &'static str,
        what: &'static str,
    },

    /// A configuration value is out of range or malformed.
    #[error("Invalid setting '{setting}': {reason}")]
    InvalidSetting {
        setting: &'static str,
        reason: String,
    },

    /// The provider could not be built.
    #[error("Failed to construct provider {provider}: {reason}")]
    ProviderConstruction {
        provider: &'static str,
        reason: String,
    },

    /// The JSON configuration file could not be loaded.
    #[error("Failed to load config file {path}: {reason}")]
    ConfigFile { path: String, reason: String },
}

/// A single detector call failed.
#[derive(Debug, thiserror::Error)]
pub enum DetectionFailure {
    #[error("Detector timed out after {0:?}")]
    Timeout(Duration),

    #[error("Detector backend unavailable: {0}")]
    Unavailable(String),

    #[error("Detector backend returned status {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("Malformed detector response: {0}")]
    MalformedResponse(String),

    #[error("Input rejected: {0}")]
    InvalidInput(String),
}

impl DetectionFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DetectionFailure::Timeout(_))
    }
}

/// A dispatch failed. Carries the operation name and when it happened.
#[derive(Debug, thiserror::Error)]
#[error("{operation} failed at {timestamp}: {cause}")]
pub struct DispatchError {
    pub operation: &'static str,
    pub timestamp: DateTime<Utc>,
    #[source]
    pub cause: DetectionFailure,
}

impl DispatchError {
    pub fn new(operation: &'static str, cause: DetectionFailure) -> Self {
        Self {
            operation,
            timestamp: Utc::now(),
            cause,
        }
    }
}
