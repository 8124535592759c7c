//! Response values produced by the orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identifiers::RequestId;

/// Lifecycle state of an admitted request.
///
/// `Running → {Completed | Failed | Cancelled}`. A request that has not been
/// admitted yet has no state; a rejected duplicate never gets one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Completed | RequestState::Failed | RequestState::Cancelled
        )
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestState::Running => write!(f, "running"),
            RequestState::Completed => write!(f, "completed"),
            RequestState::Failed => write!(f, "failed"),
            RequestState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of one tool invocation. Exactly one of `result`/`error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultRecord {
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_millis: u64,
}

impl ToolResultRecord {
    pub fn success(
        tool_name: impl Into<String>,
        result: serde_json::Value,
        duration_millis: u64,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            result: Some(result),
            error: None,
            duration_millis,
        }
    }

    pub fn failure(
        tool_name: impl Into<String>,
        error: impl Into<String>,
        duration_millis: u64,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            result: None,
            error: Some(error.into()),
            duration_millis,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// One-line summary appended to the model output.
    pub fn summary(&self) -> String {
        match (&self.result, &self.error) {
            (_, Some(error)) => format!("- {}: failed ({})", self.tool_name, error),
            (Some(serde_json::Value::String(text)), None) => {
                format!("- {}: {}", self.tool_name, text)
            }
            (Some(value), None) => format!("- {}: {}", self.tool_name, value),
            (None, None) => format!("- {}: no output", self.tool_name),
        }
    }
}

/// Metadata describing how a response was produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    pub token_count: u64,
    pub duration_millis: u64,
}

/// The single response produced for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub request_id: RequestId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_results: Option<Vec<ToolResultRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: ResponseMetadata,
}

impl Response {
    /// A failed response: empty content, `error` set.
    pub fn failure(
        request_id: RequestId,
        error: impl Into<String>,
        metadata: ResponseMetadata,
        tool_results: Option<Vec<ToolResultRecord>>,
    ) -> Self {
        Self {
            request_id,
            content: String::new(),
            tool_results,
            error: Some(error.into()),
            metadata,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_record_summary() {
        let ok = ToolResultRecord::success("grep", json!("3 matches"), 4);
        assert!(ok.is_success());
        assert_eq!(ok.summary(), "- grep: 3 matches");

        let structured = ToolResultRecord::success("stat", json!({"files": 2}), 1);
        assert_eq!(structured.summary(), r#"- stat: {"files":2}"#);

        let failed = ToolResultRecord::failure("shell", "exit code 1", 9);
        assert!(!failed.is_success());
        assert!(failed.result.is_none());
        assert_eq!(failed.summary(), "- shell: failed (exit code 1)");
    }

    #[test]
    fn test_failure_response() {
        let response = Response::failure(
            RequestId::new_unchecked("r1"),
            "No models available",
            ResponseMetadata::default(),
            None,
        );
        assert!(!response.is_success());
        assert!(response.content.is_empty());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["request_id"], "r1");
        assert!(json.get("tool_results").is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(RequestState::Cancelled.is_terminal());
        assert!(!RequestState::Running.is_terminal());
    }
}
