//! In-process prompt injection scoring.
//!
//! Each pattern carries a weight. Matched weights combine as a noisy-or,
//! `1 - Π(1 - w)`, so one strong signal is enough to flag a text and
//! several weak ones can add up to the same result.

use async_trait::async_trait;
use regex::RegexSet;

use super::DetectorProvider;
use crate::document::{InputDocument, OutcomeDocument, ScoreDoc};
use crate::error::{ConfigurationError, DetectionFailure};

/// Kind of attack a pattern points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskCategory {
    Injection,
    Jailbreak,
}

impl RiskCategory {
    pub fn label(&self) -> &'static str {
        match self {
            RiskCategory::Injection => "INJECTION",
            RiskCategory::Jailbreak => "JAILBREAK",
        }
    }
}

use RiskCategory::{Injection, Jailbreak};

/// (pattern, weight, category)
const PATTERNS: &[(&str, f64, RiskCategory)] = &[
    // Direct instruction override
    (r"(?i)ignore\s+(all\s+)?(the\s+)?previous\s+instructions?", 0.9, Injection),
    (r"(?i)ignore\s+(all\s+)?(the\s+)?prior\s+instructions?", 0.9, Injection),
    (r"(?i)disregard\s+(all\s+)?(the\s+)?previous", 0.85, Injection),
    (r"(?i)forget\s+(all\s+)?(your\s+)?instructions?", 0.85, Injection),
    (r"(?i)override\s+(your\s+)?instructions?", 0.85, Injection),
    // New instruction injection
    (r"(?i)new\s+instructions?:", 0.6, Injection),
    (r"(?i)updated\s+instructions?:", 0.6, Injection),
    (r"(?i)system\s+prompt:", 0.7, Injection),
    (r"(?i)\[system\]", 0.6, Injection),
    (r"(?i)<system>", 0.6, Injection),
    // Role manipulation
    (r"(?i)you\s+are\s+now\s+a", 0.6, Injection),
    (r"(?i)act\s+as\s+if\s+you", 0.5, Injection),
    (r"(?i)pretend\s+(to\s+be|you\s+are)", 0.5, Injection),
    (r"(?i)roleplay\s+as", 0.4, Injection),
    (r"(?i)simulate\s+being", 0.4, Injection),
    // Prompt extraction
    (r"(?i)reveal\s+((your|the)\s+)?system\s+prompt", 0.85, Injection),
    (r"(?i)show\s+(me\s+)?(your\s+)?instructions", 0.6, Injection),
    (r"(?i)what\s+(are|is)\s+(your\s+)?system\s+prompt", 0.7, Injection),
    (r"(?i)print\s+((your|the)\s+)?initial\s+prompt", 0.8, Injection),
    // Context manipulation
    (r"(?i)end\s+of\s+system\s+prompt", 0.8, Injection),
    (r"(?i)</?(system|instructions?)>", 0.6, Injection),
    (r"(?i)\[/?INST\]", 0.7, Injection),
    (r"(?i)<<SYS>>", 0.7, Injection),
    // DAN and variants
    (r"\bDAN\b", 0.6, Jailbreak),
    (r"(?i)do\s+anything\s+now", 0.9, Jailbreak),
    (r"\bSTAN\b", 0.4, Jailbreak),
    (r"\bDUDE\b", 0.3, Jailbreak),
    // Explicit jailbreak
    (r"(?i)jail\s*break", 0.85, Jailbreak),
    (r"(?i)unlock\s+your\s+(full\s+)?potential", 0.5, Jailbreak),
    // Privileged modes
    (r"(?i)developer\s+mode", 0.7, Jailbreak),
    (r"(?i)(debug|maintenance|sudo|god|admin)\s+mode", 0.6, Jailbreak),
    // Bypass attempts
    (
        r"(?i)bypass\s+(your\s+)?(programming|restrictions|filters|safety|guidelines)",
        0.85,
        Jailbreak,
    ),
    (r"(?i)circumvent\s+(your\s+)?rules", 0.8, Jailbreak),
    // Ethics bypass
    (r"(?i)ignore\s+(your\s+)?(ethical|moral|safety)", 0.85, Jailbreak),
    (r"(?i)without\s+(any\s+)?restrictions", 0.5, Jailbreak),
    (r"(?i)no\s+limitations", 0.4, Jailbreak),
    (r"(?i)unrestricted\s+mode", 0.7, Jailbreak),
    // Hypothetical framing
    (r"(?i)hypothetically\s+speaking", 0.3, Jailbreak),
    (r"(?i)in\s+a\s+hypothetical\s+scenario", 0.3, Jailbreak),
    (r"(?i)for\s+(educational|research)\s+purposes", 0.25, Jailbreak),
    // Persona forcing
    (r"(?i)evil\s+(twin|version|mode)", 0.6, Jailbreak),
    (r"(?i)(uncensored|unfiltered)\s+(version|mode)", 0.7, Jailbreak),
    // Token manipulation
    (r"(?i)\[(jailbreak|unlock|unrestricted)\]", 0.8, Jailbreak),
];

pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Pattern-based detector that runs in process
pub struct NativePromptGuard {
    patterns: RegexSet,
    threshold: f64,
}

impl NativePromptGuard {
    pub const NAME: &'static str = "native-prompt-guard";

    /// Build a detector that flags texts scoring at or above `threshold`
    pub fn new(threshold: f64) -> Result<Self, ConfigurationError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigurationError::InvalidSetting {
                setting: "threshold",
                reason: format!("{} is outside [0, 1]", threshold),
            });
        }

        let patterns = RegexSet::new(PATTERNS.iter().map(|(p, _, _)| *p)).map_err(|e| {
            ConfigurationError::ProviderConstruction {
                provider: Self::NAME,
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            patterns,
            threshold,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Risk score in `[0, 1]` and the category of the strongest match
    pub fn score(&self, text: &str) -> (f64, Option<RiskCategory>) {
        let mut benign = 1.0;
        let mut strongest: Option<(f64, RiskCategory)> = None;

        for idx in self.patterns.matches(text).into_iter() {
            let (_, weight, category) = PATTERNS[idx];
            benign *= 1.0 - weight;
            if strongest.map_or(true, |(w, _)| weight > w) {
                strongest = Some((weight, category));
            }
        }

        (1.0 - benign, strongest.map(|(_, c)| c))
    }
}

#[async_trait]
impl DetectorProvider for NativePromptGuard {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn inspect(&self, input: &InputDocument) -> Result<OutcomeDocument, DetectionFailure> {
        if input.text.trim().is_empty() {
            return Err(DetectionFailure::InvalidInput(
                "text must not be empty".to_string(),
            ));
        }

        let (score, category) = self.score(&input.text);
        if score >= self.threshold {
            Ok(OutcomeDocument::Score(ScoreDoc {
                score,
                label: category.map(|c| c.label().to_string()),
            }))
        } else {
            Ok(OutcomeDocument::Text(input.clone()))
        }
    }
}
