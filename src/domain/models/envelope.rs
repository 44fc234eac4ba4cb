use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plain success/error payload handed to front ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn ok(result: impl Into<Value>) -> Self {
        Self {
            success: true,
            result: Some(result.into()),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope() {
        let envelope = Envelope::ok(json!({"id": 1}));
        assert!(envelope.success);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"success": true, "result": {"id": 1}})
        );
    }

    #[test]
    fn test_error_envelope() {
        let envelope = Envelope::err("Task not found");
        assert!(!envelope.success);
        assert_eq!(envelope.error.as_deref(), Some("Task not found"));
        assert!(envelope.result.is_none());
    }
}
