//! Provider selection.
//!
//! A static table maps each supported [`ProviderKind`] to a constructor.
//! Resolution happens once at startup; any failure here is fatal.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::detection::{
    native, predictionguard, DetectorProvider, NativePromptGuard, PredictionGuardProvider,
};
use crate::error::ConfigurationError;

/// Supported detector backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProviderKind {
    #[default]
    Native,
    PredictionGuard,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Native, ProviderKind::PredictionGuard];

    /// Identifier as it appears in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Native => "NATIVE_PROMPT_INJECTION_DETECTION",
            ProviderKind::PredictionGuard => "PREDICTIONGUARD_PROMPT_INJECTION",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigurationError::UnknownProvider {
                name: wanted.to_string(),
                supported: ProviderKind::ALL
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Values the provider constructors may need
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Native score at or above which a text is flagged
    pub threshold: f64,
    pub predictionguard_url: String,
    pub predictionguard_api_key: Option<String>,
    /// Per-request timeout handed to network backends
    pub request_timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            threshold: native::DEFAULT_THRESHOLD,
            predictionguard_url: predictionguard::DEFAULT_BASE_URL.to_string(),
            predictionguard_api_key: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

type Constructor = fn(&ProviderSettings) -> Result<Arc<dyn DetectorProvider>, ConfigurationError>;

const REGISTRY: &[(ProviderKind, Constructor)] = &[
    (ProviderKind::Native, build_native),
    (ProviderKind::PredictionGuard, build_predictionguard),
];

fn build_native(
    settings: &ProviderSettings,
) -> Result<Arc<dyn DetectorProvider>, ConfigurationError> {
    Ok(Arc::new(NativePromptGuard::new(settings.threshold)?))
}

fn build_predictionguard(
    settings: &ProviderSettings,
) -> Result<Arc<dyn DetectorProvider>, ConfigurationError> {
    Ok(Arc::new(PredictionGuardProvider::new(
        &settings.predictionguard_url,
        settings.predictionguard_api_key.as_deref(),
        settings.request_timeout,
    )?))
}

/// Construct the provider for `kind`
pub fn resolve(
    kind: ProviderKind,
    settings: &ProviderSettings,
) -> Result<Arc<dyn DetectorProvider>, ConfigurationError> {
    let (_, constructor) = REGISTRY
        .iter()
        .find(|(k, _)| *k == kind)
        .ok_or_else(|| ConfigurationError::ProviderConstruction {
            provider: kind.as_str(),
            reason: "no constructor registered".to_string(),
        })?;

    let provider = constructor(settings)?;
    info!(component = %kind, provider = provider.name(), "Detector provider resolved");
    Ok(provider)
}

/// Parse `identifier` and construct the matching provider
pub fn resolve_named(
    identifier: &str,
    settings: &ProviderSettings,
) -> Result<Arc<dyn DetectorProvider>, ConfigurationError> {
    resolve(identifier.parse()?, settings)
}
