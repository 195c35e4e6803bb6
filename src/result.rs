//! The one result shape both backends are reduced to.

use serde::Serialize;

pub const TIMEOUT_MESSAGE: &str = "Execution timed out.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub output: String,
    pub error: Option<String>,
    pub success: bool,
    /// Unprocessed backend response, only attached on request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl ExecutionResult {
    /// Build a result where success means "no error text".
    pub fn from_streams(output: String, error: String) -> Self {
        let error = if error.is_empty() { None } else { Some(error) };
        Self {
            output,
            success: error.is_none(),
            error,
            raw: None,
        }
    }

    pub fn failure(output: String, error: impl Into<String>) -> Self {
        Self {
            output,
            error: Some(error.into()),
            success: false,
            raw: None,
        }
    }

    pub fn timed_out() -> Self {
        Self::failure(String::new(), TIMEOUT_MESSAGE)
    }

    /// Infrastructure fault turned into a value.
    pub fn execution_failed(detail: impl std::fmt::Display) -> Self {
        Self::failure(String::new(), format!("Execution failed: {}", detail))
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_shape() {
        let r = ExecutionResult::timed_out();
        assert_eq!(r.output, "");
        assert_eq!(r.error.as_deref(), Some("Execution timed out."));
        assert!(!r.success);
    }

    #[test]
    fn empty_error_is_absent() {
        let r = ExecutionResult::from_streams("7\n".into(), String::new());
        assert!(r.success);
        assert_eq!(r.error, None);

        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json, serde_json::json!({"output": "7\n", "error": null, "success": true}));
    }
}
