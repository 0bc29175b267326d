//! Uniform invocation path for the resolved detector.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::detection::DetectorProvider;
use crate::document::{InputDocument, OutcomeDocument};
use crate::error::{DetectionFailure, DispatchError};
use crate::stats::StatisticsSink;

/// Operation name latency samples are recorded under
pub const DISPATCH_OPERATION: &str = "injection_guard@prompt_injection";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Routes inputs to the active provider and records latency.
///
/// Holds no per-request state; one instance serves all concurrent requests.
pub struct Dispatcher {
    provider: Arc<dyn DetectorProvider>,
    stats: Arc<StatisticsSink>,
    timeout: Duration,
    verbose: bool,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn DetectorProvider>, stats: Arc<StatisticsSink>) -> Self {
        Self {
            provider,
            stats,
            timeout: DEFAULT_TIMEOUT,
            verbose: false,
        }
    }

    /// Bound on a single provider call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Log every input and outcome at info level
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn stats(&self) -> &Arc<StatisticsSink> {
        &self.stats
    }

    /// Inspect `input` with the active provider.
    ///
    /// A latency sample is recorded only when the provider succeeds. Failures
    /// and timeouts come back as [`DispatchError`] and are never retried.
    pub async fn dispatch(&self, input: InputDocument) -> Result<OutcomeDocument, DispatchError> {
        let start = Instant::now();

        if self.verbose {
            info!(provider = self.provider_name(), input = ?input, "Input received");
        }

        let result = match tokio::time::timeout(self.timeout, self.provider.inspect(&input)).await {
            Ok(result) => result,
            Err(_) => Err(DetectionFailure::Timeout(self.timeout)),
        };

        match result {
            Ok(outcome) => {
                let elapsed = start.elapsed().as_secs_f64();
                self.stats
                    .record_latency(DISPATCH_OPERATION, elapsed, None)
                    .await;

                if self.verbose {
                    info!(provider = self.provider_name(), output = ?outcome, "Output produced");
                }
                debug!(
                    provider = self.provider_name(),
                    outcome = outcome.kind(),
                    elapsed_ms = elapsed * 1000.0,
                    "Dispatch complete"
                );
                Ok(outcome)
            }
            Err(cause) => {
                error!(
                    provider = self.provider_name(),
                    error = %cause,
                    "Error during prompt injection invocation"
                );
                Err(DispatchError::new(DISPATCH_OPERATION, cause))
            }
        }
    }
}
