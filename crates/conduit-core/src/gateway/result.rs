//! Operation results
//!
//! A result is either a success carrying an operation-specific payload or an
//! error carrying a message, never both. It serializes to one flat mapping:
//!
//! ```json
//! {"status": "success", "provider": "dummy", "message_id": "..."}
//! {"status": "error", "provider": "sendgrid", "error": "..."}
//! ```

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// Terminal state of an operation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Operation-specific fields such as `message_id` or `url`
    Success(Map<String, Value>),
    /// Human-readable failure message
    Error(String),
}

/// Structured result returned by every gateway operation
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    provider: Option<String>,
    outcome: Outcome,
}

impl OperationResult {
    /// A successful result served by `provider`
    pub fn success(provider: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            provider: Some(provider.into()),
            outcome: Outcome::Success(payload),
        }
    }

    /// A failed result
    ///
    /// `provider` is the last provider attempted, if any got that far.
    pub fn error(provider: Option<String>, message: impl Into<String>) -> Self {
        Self {
            provider,
            outcome: Outcome::Error(message.into()),
        }
    }

    /// `"success"` or `"error"`
    pub fn status(&self) -> &'static str {
        match self.outcome {
            Outcome::Success(_) => "success",
            Outcome::Error(_) => "error",
        }
    }

    /// Whether the operation succeeded
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    /// Provider that served (or last attempted) the call
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// The outcome
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Success payload
    pub fn payload(&self) -> Option<&Map<String, Value>> {
        match &self.outcome {
            Outcome::Success(payload) => Some(payload),
            Outcome::Error(_) => None,
        }
    }

    /// A payload field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload().and_then(|p| p.get(key))
    }

    /// A string payload field
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Error message
    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Error(message) => Some(message),
        }
    }

    /// Flat JSON form
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for OperationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("status", self.status())?;
        if let Some(provider) = &self.provider {
            map.serialize_entry("provider", provider)?;
        }
        match &self.outcome {
            Outcome::Success(payload) => {
                for (key, value) in payload {
                    if key != "status" && key != "provider" {
                        map.serialize_entry(key, value)?;
                    }
                }
            }
            Outcome::Error(message) => map.serialize_entry("error", message)?,
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_serializes_flat() {
        let mut payload = Map::new();
        payload.insert("message_id".into(), json!("m-1"));
        payload.insert("status".into(), json!("queued"));

        let result = OperationResult::success("dummy", payload);
        assert_eq!(
            result.to_value(),
            json!({"status": "success", "provider": "dummy", "message_id": "m-1"})
        );
        assert_eq!(result.get_str("message_id"), Some("m-1"));
        assert_eq!(result.error_message(), None);
    }

    #[test]
    fn test_error_has_message_and_no_payload() {
        let result = OperationResult::error(None, "boom");
        assert_eq!(result.to_value(), json!({"status": "error", "error": "boom"}));
        assert!(result.payload().is_none());
        assert!(!result.is_success());
    }
}
