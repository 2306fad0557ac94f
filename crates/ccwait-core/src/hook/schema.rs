//! Stop hook output schema.
//!
//! Recognised fields:
//! - `decision`: "approve" | "block"
//! - `reason`: explanation, required when blocking
//! - `continue`: takes precedence over `decision`
//! - `stopReason`: shown when `continue` is false
//! - `suppressOutput`: hide stdout from the transcript
//! - `systemMessage`: warning shown to the user

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Every top-level field the caller accepts
pub const VALID_FIELDS: [&str; 6] = [
    "decision",
    "reason",
    "continue",
    "stopReason",
    "suppressOutput",
    "systemMessage",
];

const VALID_DECISIONS: [&str; 2] = ["approve", "block"];

#[derive(Debug, Error)]
pub enum HookOutputError {
    #[error("invalid Stop hook output: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("failed to serialize Stop hook output: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Block,
}

/// One Stop hook response; unset fields are omitted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HookOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppress_output: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}

impl HookOutput {
    /// Allow the assistant to stop
    pub fn approve() -> Self {
        Self {
            decision: Some(Decision::Approve),
            ..Self::default()
        }
    }

    /// Refuse the stop, telling the assistant why
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            decision: Some(Decision::Block),
            reason: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn is_block(&self) -> bool {
        self.decision == Some(Decision::Block)
    }

    /// Serialize to a single JSON line, refusing to emit invalid output
    pub fn to_json_line(&self) -> Result<String, HookOutputError> {
        let value = serde_json::to_value(self)?;
        let errors = validate_hook_output(&value);
        if !errors.is_empty() {
            return Err(HookOutputError::Invalid(errors));
        }
        Ok(serde_json::to_string(&value)?)
    }
}

/// Check a candidate output object, returning every violation found
pub fn validate_hook_output(output: &Value) -> Vec<String> {
    let Some(obj) = output.as_object() else {
        return vec!["Stop hook output must be a JSON object".to_string()];
    };

    let mut errors = Vec::new();

    for field in obj.keys() {
        if !VALID_FIELDS.contains(&field.as_str()) {
            errors.push(format!(
                "Unknown field '{}'. Valid fields: {}",
                field,
                VALID_FIELDS.join(", ")
            ));
        }
    }

    for (field, value) in obj {
        let expected = match field.as_str() {
            "continue" | "suppressOutput" => "boolean",
            "decision" | "reason" | "stopReason" | "systemMessage" => "string",
            _ => continue,
        };
        let ok = match expected {
            "boolean" => value.is_boolean(),
            _ => value.is_string(),
        };
        if !ok {
            errors.push(format!(
                "Field '{}' must be {}, got {}",
                field,
                expected,
                type_name(value)
            ));
        }
    }

    if let Some(decision) = obj.get("decision").and_then(Value::as_str) {
        if !VALID_DECISIONS.contains(&decision) {
            errors.push(format!(
                "Invalid decision '{}'. Must be one of: {}",
                decision,
                VALID_DECISIONS.join(", ")
            ));
        }
        if decision == "block" && !obj.contains_key("reason") {
            errors.push("Field 'reason' is required when decision is 'block'".to_string());
        }
    }

    errors
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_approve_and_block_lines() {
        assert_eq!(
            HookOutput::approve().to_json_line().unwrap(),
            r#"{"decision":"approve"}"#
        );
        assert_eq!(
            HookOutput::block("continue").to_json_line().unwrap(),
            r#"{"decision":"block","reason":"continue"}"#
        );
    }

    #[test]
    fn test_all_fields_serialize_with_wire_names() {
        let output = HookOutput {
            decision: None,
            reason: None,
            continue_: Some(false),
            stop_reason: Some("done".into()),
            suppress_output: Some(true),
            system_message: Some("hi".into()),
        };
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(
            value,
            json!({
                "continue": false,
                "stopReason": "done",
                "suppressOutput": true,
                "systemMessage": "hi"
            })
        );
        assert!(validate_hook_output(&value).is_empty());
    }

    #[test]
    fn test_block_without_reason_is_rejected() {
        let output = HookOutput {
            decision: Some(Decision::Block),
            ..HookOutput::default()
        };
        match output.to_json_line() {
            Err(HookOutputError::Invalid(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("reason"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_reports_every_violation() {
        let errors = validate_hook_output(&json!({
            "decision": "allow",
            "continue": "yes",
            "extra": 1
        }));
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("Unknown field 'extra'")));
        assert!(errors.iter().any(|e| e.contains("'continue' must be boolean")));
        assert!(errors.iter().any(|e| e.contains("Invalid decision 'allow'")));
    }

    #[test]
    fn test_wrong_decision_type() {
        let errors = validate_hook_output(&json!({ "decision": true }));
        assert_eq!(errors, vec!["Field 'decision' must be string, got boolean"]);
    }

    #[test]
    fn test_non_object_rejected() {
        assert_eq!(validate_hook_output(&json!([1, 2])).len(), 1);
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        assert!(serde_json::from_str::<HookOutput>(r#"{"decision":"approve","x":1}"#).is_err());
        let parsed: HookOutput =
            serde_json::from_str(r#"{"decision":"block","reason":"continue"}"#).unwrap();
        assert!(parsed.is_block());
    }
}
