use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Uniform result of one tool execution.
///
/// Success carries a human-readable message plus tool-specific payload
/// fields; failure carries only an error string. Exactly one of the two
/// arms is ever populated, and the JSON form keeps the discriminant in
/// the `success` field.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success {
        message: String,
        /// Extra fields merged into the serialized object (always a JSON
        /// object; empty when the tool has nothing beyond the message).
        payload: serde_json::Value,
    },
    Failure {
        error: String,
    },
}

impl ToolOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        ToolOutcome::Success {
            message: message.into(),
            payload: serde_json::json!({}),
        }
    }

    pub fn success_with(message: impl Into<String>, payload: serde_json::Value) -> Self {
        debug_assert!(payload.is_object(), "tool payload must be a JSON object");
        ToolOutcome::Success {
            message: message.into(),
            payload,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ToolOutcome::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }

    /// The uniform JSON shape fed back to the model and printed by the CLI.
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            ToolOutcome::Success { message, payload } => {
                let mut obj = serde_json::Map::new();
                obj.insert("success".into(), serde_json::Value::Bool(true));
                obj.insert("message".into(), serde_json::Value::String(message.clone()));
                if let Some(extra) = payload.as_object() {
                    for (k, v) in extra {
                        obj.insert(k.clone(), v.clone());
                    }
                }
                serde_json::Value::Object(obj)
            }
            ToolOutcome::Failure { error } => serde_json::json!({
                "success": false,
                "error": error,
            }),
        }
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| "tool outcome must be a JSON object".to_string())?;
        let success = obj
            .get("success")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| "tool outcome missing boolean 'success'".to_string())?;

        if success {
            let message = obj
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let mut payload = serde_json::Map::new();
            for (k, v) in obj {
                if k != "success" && k != "message" {
                    payload.insert(k.clone(), v.clone());
                }
            }
            Ok(ToolOutcome::Success {
                message,
                payload: serde_json::Value::Object(payload),
            })
        } else {
            let error = obj
                .get("error")
                .and_then(|v| v.as_str())
                .ok_or_else(|| "failed tool outcome missing 'error'".to_string())?
                .to_string();
            Ok(ToolOutcome::Failure { error })
        }
    }
}

impl Serialize for ToolOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ToolOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        ToolOutcome::from_value(value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_round_trips_discriminant_and_payload() {
        let outcome = ToolOutcome::success_with(
            "2+2 = 4",
            serde_json::json!({"result": "4"}),
        );
        let json = serde_json::to_string(&outcome).unwrap();
        let back: ToolOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(outcome, back);
        assert!(back.is_success());
    }

    #[test]
    fn failure_round_trips() {
        let outcome = ToolOutcome::failure("no element matches 'name:DoesNotExist'");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], serde_json::json!(false));
        let back = ToolOutcome::from_value(json).unwrap();
        assert_eq!(outcome, back);
    }

    #[test]
    fn payload_fields_are_flattened() {
        let outcome = ToolOutcome::success_with(
            "Found 0 elements",
            serde_json::json!({"count": 0, "elements": []}),
        );
        let json = outcome.to_value();
        assert_eq!(json["count"], serde_json::json!(0));
        assert_eq!(json["elements"], serde_json::json!([]));
        assert_eq!(json["success"], serde_json::json!(true));
    }

    #[test]
    fn missing_discriminant_is_rejected() {
        assert!(ToolOutcome::from_value(serde_json::json!({"message": "hi"})).is_err());
        assert!(ToolOutcome::from_value(serde_json::json!({"success": false})).is_err());
    }
}
