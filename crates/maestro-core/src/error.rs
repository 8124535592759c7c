//! Error taxonomy for request orchestration.

use thiserror::Error;

use crate::identifiers::{IdValidationError, RequestId};

/// Errors raised while driving a request.
///
/// Only [`OrchestratorError::DuplicateRequest`] ever reaches the caller of
/// `execute` as an `Err`. Every other variant is rendered into the
/// `error` field of the failed response.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestratorError {
    /// A request with the same id is already in flight.
    #[error("Request '{0}' is already in flight")]
    DuplicateRequest(RequestId),

    /// No provider listed any model.
    #[error("No models available")]
    NoModelsAvailable,

    /// The selected model is not served by any registered provider.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Upstream provider failure.
    #[error("Model provider '{provider}' failed: {message}")]
    ModelProvider {
        provider: String,
        message: String,
        retryable: bool,
    },

    /// A tool failed. Recorded in the response, never fatal.
    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Request was cancelled")]
    Cancelled,

    /// Memory persistence failed. Logged, never surfaced.
    #[error("Memory persistence failed: {0}")]
    MemoryPersistence(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl OrchestratorError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            OrchestratorError::ModelProvider { retryable, .. } => *retryable,
            OrchestratorError::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            OrchestratorError::DuplicateRequest(_) => "DUPLICATE_REQUEST",
            OrchestratorError::NoModelsAvailable => "NO_MODELS_AVAILABLE",
            OrchestratorError::ModelNotFound(_) => "MODEL_NOT_FOUND",
            OrchestratorError::ModelProvider { .. } => "MODEL_PROVIDER_ERROR",
            OrchestratorError::ToolExecution { .. } => "TOOL_EXECUTION_ERROR",
            OrchestratorError::Timeout { .. } => "TIMEOUT",
            OrchestratorError::Cancelled => "CANCELLED",
            OrchestratorError::MemoryPersistence(_) => "MEMORY_PERSISTENCE_ERROR",
            OrchestratorError::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }

    /// True for the errors that end a request in the `Cancelled` state.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, OrchestratorError::Cancelled)
    }
}

/// Result type for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

impl From<IdValidationError> for OrchestratorError {
    fn from(err: IdValidationError) -> Self {
        OrchestratorError::InvalidRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::DuplicateRequest(RequestId::new_unchecked("r1"));
        assert_eq!(err.to_string(), "Request 'r1' is already in flight");

        let err = OrchestratorError::Timeout { duration_ms: 250 };
        assert_eq!(err.to_string(), "Request timed out after 250ms");
    }

    #[rstest]
    #[case(OrchestratorError::Timeout { duration_ms: 1 }, true)]
    #[case(OrchestratorError::ModelProvider { provider: "openai".into(), message: "429".into(), retryable: true }, true)]
    #[case(OrchestratorError::ModelProvider { provider: "openai".into(), message: "bad key".into(), retryable: false }, false)]
    #[case(OrchestratorError::Cancelled, false)]
    #[case(OrchestratorError::NoModelsAvailable, false)]
    fn test_is_retryable(#[case] err: OrchestratorError, #[case] expected: bool) {
        assert_eq!(err.is_retryable(), expected);
    }

    #[test]
    fn test_error_code() {
        assert_eq!(OrchestratorError::Cancelled.error_code(), "CANCELLED");
        assert_eq!(
            OrchestratorError::ModelNotFound("gpt-5".to_string()).error_code(),
            "MODEL_NOT_FOUND"
        );
    }

    #[test]
    fn test_from_id_validation() {
        let err: OrchestratorError = IdValidationError::Empty.into();
        assert_eq!(err.error_code(), "INVALID_REQUEST");
    }
}
