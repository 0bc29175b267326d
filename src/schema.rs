//! JSON Schema validation for inbound requests and backend responses.

use jsonschema::{JSONSchema, ValidationError};
use serde_json::Value;
use std::sync::OnceLock;

/// Schema validation result
#[derive(Debug, Clone)]
pub struct SchemaValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl SchemaValidationResult {
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

/// Body of `POST /v1/injection`
const TEXT_DOC_SCHEMA: &str = r#"{
    "$schema": "http://json-schema.org/draft-07/schema#",
    "title": "Injection Inspection Request",
    "type": "object",
    "required": ["text"],
    "properties": {
        "text": {
            "type": "string",
            "minLength": 1,
            "pattern": "\\S"
        },
        "metadata": {
            "type": ["object", "null"]
        }
    },
    "additionalProperties": true
}"#;

/// Prediction Guard `/injection` response
const PREDICTIONGUARD_RESPONSE_SCHEMA: &str = r#"{
    "$schema": "http://json-schema.org/draft-07/schema#",
    "title": "Prediction Guard Injection Response",
    "type": "object",
    "required": ["checks"],
    "properties": {
        "checks": {
            "type": "array",
            "minItems": 1,
            "items": {
                "type": "object",
                "required": ["probability"],
                "properties": {
                    "probability": {
                        "type": "number",
                        "minimum": 0,
                        "maximum": 1
                    },
                    "index": {"type": "integer"},
                    "status": {"type": "string"}
                }
            }
        }
    },
    "additionalProperties": true
}"#;

// Compiled schemas (cached)
static TEXT_DOC_COMPILED: OnceLock<JSONSchema> = OnceLock::new();
static PREDICTIONGUARD_RESPONSE_COMPILED: OnceLock<JSONSchema> = OnceLock::new();

fn get_text_doc_schema() -> &'static JSONSchema {
    TEXT_DOC_COMPILED.get_or_init(|| {
        let schema: Value = serde_json::from_str(TEXT_DOC_SCHEMA).expect("text doc schema is JSON");
        JSONSchema::compile(&schema).expect("text doc schema compiles")
    })
}

fn get_predictionguard_response_schema() -> &'static JSONSchema {
    PREDICTIONGUARD_RESPONSE_COMPILED.get_or_init(|| {
        let schema: Value = serde_json::from_str(PREDICTIONGUARD_RESPONSE_SCHEMA)
            .expect("prediction guard schema is JSON");
        JSONSchema::compile(&schema).expect("prediction guard schema compiles")
    })
}

fn format_validation_errors<'a>(errors: impl Iterator<Item = ValidationError<'a>>) -> Vec<String> {
    errors
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{}: {}", path, e)
            }
        })
        .collect()
}

fn validate(schema: &JSONSchema, value: &Value) -> SchemaValidationResult {
    match schema.validate(value) {
        Ok(_) => SchemaValidationResult::valid(),
        Err(errors) => SchemaValidationResult::invalid(format_validation_errors(errors)),
    }
}

/// Validate an inspection request body
pub fn validate_text_doc(value: &Value) -> SchemaValidationResult {
    validate(get_text_doc_schema(), value)
}

/// Validate a Prediction Guard injection response
pub fn validate_predictionguard_response(value: &Value) -> SchemaValidationResult {
    validate(get_predictionguard_response_schema(), value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_text_doc() {
        assert!(validate_text_doc(&json!({"text": "hello"})).valid);
        assert!(validate_text_doc(&json!({"text": "hello", "metadata": {"a": 1}})).valid);
        assert!(validate_text_doc(&json!({"text": "hello", "metadata": null})).valid);
    }

    #[test]
    fn test_text_doc_missing_text() {
        let result = validate_text_doc(&json!({"prompt": "hello"}));
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("text")));
    }

    #[test]
    fn test_text_doc_empty_or_blank_text() {
        assert!(!validate_text_doc(&json!({"text": ""})).valid);
        assert!(!validate_text_doc(&json!({"text": "   "})).valid);
    }

    #[test]
    fn test_text_doc_wrong_types() {
        let result = validate_text_doc(&json!({"text": 42}));
        assert!(!result.valid);
        assert!(result.errors[0].starts_with("/text"));
        assert!(!validate_text_doc(&json!({"text": "x", "metadata": "nope"})).valid);
        assert!(!validate_text_doc(&json!(["text"])).valid);
    }

    #[test]
    fn test_valid_predictionguard_response() {
        let body = json!({
            "checks": [{"probability": 0.97, "index": 0, "status": "success"}],
            "created": 1726861951,
            "id": "injection-abc",
            "object": "injection_check"
        });
        assert!(validate_predictionguard_response(&body).valid);
    }

    #[test]
    fn test_predictionguard_response_invalid() {
        assert!(!validate_predictionguard_response(&json!({"checks": []})).valid);
        assert!(!validate_predictionguard_response(&json!({"error": "nope"})).valid);
        assert!(
            !validate_predictionguard_response(&json!({"checks": [{"probability": "high"}]}))
                .valid
        );
        assert!(!validate_predictionguard_response(&json!({"checks": [{"probability": 1.7}]})).valid);
    }
}
