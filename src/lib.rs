//! Prompt injection guard for Zentinel.
//!
//! Serves a single inspection endpoint backed by one detector provider,
//! chosen at startup:
//! - `NATIVE_PROMPT_INJECTION_DETECTION`: in-process weighted pattern scoring
//! - `PREDICTIONGUARD_PROMPT_INJECTION`: the Prediction Guard injection API
//!
//! Every successful inspection records a latency sample, exposed on
//! `/v1/statistics`.

pub mod detection;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod registry;
pub mod schema;
pub mod server;
pub mod stats;

use axum::Router;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub use detection::{DetectorProvider, NativePromptGuard, PredictionGuardProvider};
pub use dispatch::{Dispatcher, DISPATCH_OPERATION};
pub use document::{InputDocument, OutcomeDocument, ScoreDoc, TextDoc};
pub use error::{ConfigurationError, DetectionFailure, DispatchError};
pub use registry::{ProviderKind, ProviderSettings};
pub use stats::{LatencySample, LatencySummary, StatisticsSink};

pub const DEFAULT_PORT: u16 = 9085;

/// JSON-serializable configuration for the guard
///
/// Loaded from the file given with `--config`. Every field is optional;
/// present fields override the command line values.
/// Field names use kebab-case to match typical YAML/JSON config style.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct InjectionGuardConfigJson {
    /// Provider identifier, e.g. "NATIVE_PROMPT_INJECTION_DETECTION"
    #[serde(default)]
    pub component_name: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Native detector flag threshold
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Provider call timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<f64>,
    #[serde(default)]
    pub predictionguard_url: Option<String>,
    #[serde(default)]
    pub predictionguard_api_key: Option<String>,
    #[serde(default)]
    pub verbose: Option<bool>,
}

impl InjectionGuardConfigJson {
    /// Read and parse a JSON config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let config_error = |reason: String| ConfigurationError::ConfigFile {
            path: path.display().to_string(),
            reason,
        };

        let raw = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| config_error(e.to_string()))
    }

    /// Overlay the fields present in this file onto `base`
    pub fn apply(self, base: InjectionGuardConfig) -> Result<InjectionGuardConfig, ConfigurationError> {
        let mut config = base;

        if let Some(name) = self.component_name {
            config.component = name.parse()?;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = timeout_from_secs(secs)?;
        }
        if let Some(url) = self.predictionguard_url {
            config.predictionguard_url = url;
        }
        if let Some(key) = self.predictionguard_api_key {
            config.predictionguard_api_key = Some(key);
        }
        if let Some(verbose) = self.verbose {
            config.verbose = verbose;
        }

        Ok(config)
    }
}

/// Convert a timeout in seconds, rejecting zero, negative and non-finite values
pub fn timeout_from_secs(secs: f64) -> Result<Duration, ConfigurationError> {
    match Duration::try_from_secs_f64(secs) {
        Ok(timeout) if !timeout.is_zero() => Ok(timeout),
        _ => Err(ConfigurationError::InvalidSetting {
            setting: "timeout_secs",
            reason: format!("{} is not a positive number of seconds", secs),
        }),
    }
}

/// Configuration for the injection guard
#[derive(Debug, Clone)]
pub struct InjectionGuardConfig {
    /// Which detector backend to run
    pub component: ProviderKind,
    pub host: String,
    pub port: u16,
    /// Native detector flag threshold
    pub threshold: f64,
    /// Bound on a single provider call
    pub timeout: Duration,
    pub predictionguard_url: String,
    pub predictionguard_api_key: Option<String>,
    /// Log every input and outcome
    pub verbose: bool,
}

impl Default for InjectionGuardConfig {
    fn default() -> Self {
        let settings = ProviderSettings::default();
        Self {
            component: ProviderKind::default(),
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            threshold: settings.threshold,
            timeout: dispatch::DEFAULT_TIMEOUT,
            predictionguard_url: settings.predictionguard_url,
            predictionguard_api_key: None,
            verbose: false,
        }
    }
}

impl InjectionGuardConfig {
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            threshold: self.threshold,
            predictionguard_url: self.predictionguard_url.clone(),
            predictionguard_api_key: self.predictionguard_api_key.clone(),
            request_timeout: self.timeout,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The assembled service: resolved provider, dispatcher and statistics
pub struct InjectionGuard {
    config: InjectionGuardConfig,
    dispatcher: Arc<Dispatcher>,
}

impl InjectionGuard {
    /// Resolve the configured provider and wire up the dispatcher.
    ///
    /// Fails if the provider cannot be constructed; nothing is served then.
    pub fn new(config: InjectionGuardConfig) -> Result<Self, ConfigurationError> {
        if config.timeout.is_zero() {
            return Err(ConfigurationError::InvalidSetting {
                setting: "timeout_secs",
                reason: "timeout must be positive".to_string(),
            });
        }

        let provider = registry::resolve(config.component, &config.provider_settings())?;
        let stats = Arc::new(StatisticsSink::new());
        let dispatcher = Dispatcher::new(provider, stats)
            .with_timeout(config.timeout)
            .with_verbose(config.verbose);

        debug!(component = %config.component, timeout = ?config.timeout, "Injection guard assembled");

        Ok(Self {
            config,
            dispatcher: Arc::new(dispatcher),
        })
    }

    pub fn config(&self) -> &InjectionGuardConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn stats(&self) -> &Arc<StatisticsSink> {
        self.dispatcher.stats()
    }

    /// HTTP routes for this guard
    pub fn router(&self) -> Router {
        server::create_router(server::AppState {
            dispatcher: self.dispatcher.clone(),
            component: self.config.component,
        })
    }
}
