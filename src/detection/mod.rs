//! Detector providers.
//!
//! Every backend implements [`DetectorProvider`]. The dispatcher only ever
//! sees `Arc<dyn DetectorProvider>`, so backends are interchangeable.

pub mod native;
pub mod predictionguard;

use async_trait::async_trait;

use crate::document::{InputDocument, OutcomeDocument};
use crate::error::DetectionFailure;

pub use native::{NativePromptGuard, RiskCategory};
pub use predictionguard::PredictionGuardProvider;

/// A backend that decides whether a text is a prompt injection attempt
#[async_trait]
pub trait DetectorProvider: Send + Sync {
    /// Short name used in logs and health output
    fn name(&self) -> &'static str;

    /// Inspect one input and report an outcome.
    ///
    /// Implementations must not retry internally.
    async fn inspect(&self, input: &InputDocument) -> Result<OutcomeDocument, DetectionFailure>;
}
