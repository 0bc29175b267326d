//! Documents exchanged with detector providers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A text payload, used both as inspection input and as pass-through output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDoc {
    pub text: String,
    /// Caller-supplied fields, carried through unchanged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl TextDoc {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Document submitted for inspection.
pub type InputDocument = TextDoc;

/// A risk score produced by a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDoc {
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Result of an inspection.
///
/// Which variant comes back is up to the provider. On the wire the variant
/// is not tagged; the JSON shape alone tells the caller what it got.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutcomeDocument {
    /// Not flagged; the text is passed through
    Text(TextDoc),
    /// Scored by the detector
    Score(ScoreDoc),
}

impl OutcomeDocument {
    pub fn kind(&self) -> &'static str {
        match self {
            OutcomeDocument::Text(_) => "text",
            OutcomeDocument::Score(_) => "score",
        }
    }

    pub fn as_score(&self) -> Option<&ScoreDoc> {
        match self {
            OutcomeDocument::Score(doc) => Some(doc),
            OutcomeDocument::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextDoc> {
        match self {
            OutcomeDocument::Text(doc) => Some(doc),
            OutcomeDocument::Score(_) => None,
        }
    }
}
