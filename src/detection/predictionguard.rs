//! Prediction Guard injection API client.
//!
//! Forwards the text to `POST {base_url}/injection` and turns the first
//! check's probability into a score.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::DetectorProvider;
use crate::document::{InputDocument, OutcomeDocument, ScoreDoc};
use crate::error::{ConfigurationError, DetectionFailure};
use crate::schema;

pub const DEFAULT_BASE_URL: &str = "https://api.predictionguard.com";

/// Longest backend error body kept in a failure
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Serialize)]
struct InjectionRequest<'a> {
    prompt: &'a str,
    detect: bool,
}

#[derive(Debug, Deserialize)]
struct InjectionResponse {
    checks: Vec<InjectionCheck>,
}

#[derive(Debug, Deserialize)]
struct InjectionCheck {
    probability: f64,
    #[serde(default)]
    status: Option<String>,
}

/// Detector backed by the Prediction Guard API
pub struct PredictionGuardProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    request_timeout: Duration,
}

impl PredictionGuardProvider {
    pub const NAME: &'static str = "predictionguard";

    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        request_timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        let api_key = match api_key.map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => {
                return Err(ConfigurationError::MissingCredential {
                    provider: Self::NAME,
                    what: "PREDICTIONGUARD_API_KEY",
                })
            }
        };

        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigurationError::InvalidSetting {
                setting: "predictionguard_url",
                reason: format!("'{}' is not an http(s) URL", base_url),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ConfigurationError::ProviderConstruction {
                provider: Self::NAME,
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/injection", base_url),
            api_key,
            request_timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_failure(&self, err: reqwest::Error) -> DetectionFailure {
        if err.is_timeout() {
            DetectionFailure::Timeout(self.request_timeout)
        } else {
            DetectionFailure::Unavailable(err.to_string())
        }
    }
}

/// Map a successful response body to a score
fn parse_response(body: &str) -> Result<ScoreDoc, DetectionFailure> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| DetectionFailure::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let validation = schema::validate_predictionguard_response(&value);
    if !validation.valid {
        return Err(DetectionFailure::MalformedResponse(
            validation.errors.join("; "),
        ));
    }

    let parsed: InjectionResponse = serde_json::from_value(value)
        .map_err(|e| DetectionFailure::MalformedResponse(e.to_string()))?;

    let check = parsed
        .checks
        .into_iter()
        .next()
        .ok_or_else(|| DetectionFailure::MalformedResponse("no checks returned".to_string()))?;

    if let Some(status) = check.status.filter(|s| s != "success") {
        return Err(DetectionFailure::MalformedResponse(format!(
            "check status '{}'",
            status
        )));
    }

    Ok(ScoreDoc {
        score: check.probability,
        label: None,
    })
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

#[async_trait]
impl DetectorProvider for PredictionGuardProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn inspect(&self, input: &InputDocument) -> Result<OutcomeDocument, DetectionFailure> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&InjectionRequest {
                prompt: &input.text,
                detect: true,
            })
            .send()
            .await
            .map_err(|e| self.transport_failure(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_failure(e))?;

        debug!(status = status.as_u16(), bytes = body.len(), "Prediction Guard responded");

        if !status.is_success() {
            return Err(DetectionFailure::Backend {
                status: status.as_u16(),
                body: truncate(body),
            });
        }

        parse_response(&body).map(OutcomeDocument::Score)
    }
}
