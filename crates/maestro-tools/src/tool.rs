//! The tool contract: descriptor, execution context and errors.

use async_trait::async_trait;
use maestro_core::{CapabilitySet, OrchestratorError, RequestId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Static description of a tool. Registered once, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments the tool accepts.
    #[serde(default)]
    pub parameter_spec: serde_json::Value,
    pub capabilities: CapabilitySet,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        capabilities: CapabilitySet,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameter_spec: serde_json::json!({ "type": "object" }),
            capabilities,
        }
    }

    pub fn with_parameter_spec(mut self, spec: serde_json::Value) -> Self {
        self.parameter_spec = spec;
        self
    }
}

/// Execution context handed to every tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContext {
    pub request_id: RequestId,
    pub workspace_root: Option<PathBuf>,
    pub working_directory: PathBuf,
    pub timeout_millis: u64,
}

impl ToolContext {
    pub fn new(request_id: RequestId, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            request_id,
            workspace_root: None,
            working_directory: working_directory.into(),
            timeout_millis: 30_000,
        }
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn with_timeout_millis(mut self, timeout_millis: u64) -> Self {
        self.timeout_millis = timeout_millis;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis)
    }

    /// Workspace root if set, else the working directory.
    pub fn base_directory(&self) -> &PathBuf {
        self.workspace_root.as_ref().unwrap_or(&self.working_directory)
    }
}

/// Errors raised by tools and the tool registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool '{0}' is already registered")]
    Duplicate(String),

    #[error("Tool '{0}' is unavailable")]
    Unavailable(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Execution(String),

    #[error("Tool '{tool}' timed out after {duration_ms}ms")]
    Timeout { tool: String, duration_ms: u64 },

    #[error("Tool '{0}' panicked")]
    Panicked(String),
}

impl ToolError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ToolError::NotFound(_) => "TOOL_NOT_FOUND",
            ToolError::Duplicate(_) => "TOOL_DUPLICATE",
            ToolError::Unavailable(_) => "TOOL_UNAVAILABLE",
            ToolError::InvalidArguments(_) => "INVALID_ARGUMENTS",
            ToolError::Execution(_) => "TOOL_EXECUTION_ERROR",
            ToolError::Timeout { .. } => "TOOL_TIMEOUT",
            ToolError::Panicked(_) => "TOOL_PANICKED",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ToolError::Timeout { .. } | ToolError::Unavailable(_))
    }
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError::Execution(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::InvalidArguments(err.to_string())
    }
}

/// Converts a tool failure into the orchestrator taxonomy, tagged with the
/// tool name.
pub fn into_orchestrator_error(tool: &str, err: ToolError) -> OrchestratorError {
    OrchestratorError::ToolExecution {
        tool: tool.to_string(),
        message: err.to_string(),
    }
}

/// A named, side-effecting capability.
///
/// Implementations must be cheap to share; the registry stores them behind
/// `Arc` and may invoke them from many requests at once.
#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    fn capabilities(&self) -> &CapabilitySet {
        &self.descriptor().capabilities
    }

    /// Unavailable tools are never selected for dispatch.
    fn is_available(&self) -> bool {
        true
    }

    async fn invoke(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, ToolError>;
}
