//! Argument validation against a tool's declared parameter schema.
//!
//! Covers the JSON-Schema subset the built-in tools actually declare:
//! an object with typed properties, a `required` list, and optional
//! `enum` constraints. Anything the model sends beyond the declared
//! properties is passed through untouched.

use crate::errors::{DeskPilotError, DeskPilotResult};

/// Parse and validate the model-supplied raw argument string against
/// the schema. Returns the argument object on success.
pub fn validate_args(schema: &serde_json::Value, raw: &str) -> DeskPilotResult<serde_json::Value> {
    let raw = raw.trim();
    let args: serde_json::Value = if raw.is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_str(raw)
            .map_err(|e| DeskPilotError::InvalidArguments(format!("arguments are not valid JSON: {e}")))?
    };

    let Some(obj) = args.as_object() else {
        return Err(DeskPilotError::InvalidArguments(
            "arguments must be a JSON object".into(),
        ));
    };

    if let Some(required) = schema["required"].as_array() {
        for field in required {
            let Some(name) = field.as_str() else { continue };
            if !obj.contains_key(name) || obj[name].is_null() {
                return Err(DeskPilotError::InvalidArguments(format!(
                    "missing required field '{name}'"
                )));
            }
        }
    }

    if let Some(properties) = schema["properties"].as_object() {
        for (name, prop) in properties {
            let Some(value) = obj.get(name) else { continue };
            if value.is_null() {
                continue;
            }

            if let Some(expected) = prop["type"].as_str() {
                if !type_matches(expected, value) {
                    return Err(DeskPilotError::InvalidArguments(format!(
                        "field '{name}' must be of type {expected}"
                    )));
                }
            }

            if let Some(allowed) = prop["enum"].as_array() {
                if !allowed.contains(value) {
                    return Err(DeskPilotError::InvalidArguments(format!(
                        "field '{name}' must be one of {allowed:?}"
                    )));
                }
            }
        }
    }

    Ok(args)
}

fn type_matches(expected: &str, value: &serde_json::Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "integer" => {
            value.is_i64()
                || value.is_u64()
                // Integer-valued floats are common model output ("size": 100.0).
                || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        "number" => value.is_number(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "selector": {"type": "string"},
                "clicks": {"type": "integer"},
                "button": {"type": "string", "enum": ["left", "right", "middle"]},
            },
            "required": ["selector"]
        })
    }

    #[test]
    fn accepts_valid_arguments() {
        let args = validate_args(&schema(), r#"{"selector":"name:Seven","clicks":2}"#).unwrap();
        assert_eq!(args["selector"], "name:Seven");
    }

    #[test]
    fn empty_raw_string_means_empty_object() {
        let schema = serde_json::json!({"type": "object", "properties": {}});
        assert!(validate_args(&schema, "").is_ok());
    }

    #[test]
    fn missing_required_field_is_invalid() {
        let err = validate_args(&schema(), r#"{"clicks":1}"#).unwrap_err();
        assert!(matches!(err, DeskPilotError::InvalidArguments(_)));
        assert!(err.to_string().contains("selector"));
    }

    #[test]
    fn type_mismatch_is_invalid() {
        let err = validate_args(&schema(), r#"{"selector":7}"#).unwrap_err();
        assert!(matches!(err, DeskPilotError::InvalidArguments(_)));
    }

    #[test]
    fn enum_violation_is_invalid() {
        let err = validate_args(
            &schema(),
            r#"{"selector":"x","button":"fourth"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DeskPilotError::InvalidArguments(_)));
    }

    #[test]
    fn integer_valued_float_is_coerced() {
        assert!(validate_args(&schema(), r#"{"selector":"x","clicks":2.0}"#).is_ok());
        assert!(validate_args(&schema(), r#"{"selector":"x","clicks":2.5}"#).is_err());
    }

    #[test]
    fn non_object_arguments_are_invalid() {
        assert!(validate_args(&schema(), r#"[1,2]"#).is_err());
        assert!(validate_args(&schema(), "not json").is_err());
    }
}
