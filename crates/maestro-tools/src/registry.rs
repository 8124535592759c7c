//! Tool registry and capability-driven dispatch.

use futures::FutureExt;
use maestro_core::{OrchestratorError, RequestKind, ToolResultRecord};
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::eligibility::EligibilityTable;
use crate::tool::{Tool, ToolContext, ToolDescriptor, ToolError, into_orchestrator_error};

/// Holds named tools in registration order.
///
/// Tools are registered at startup and never removed. Dispatch order is
/// registration order, so results are deterministic within one process.
///
/// ```rust
/// use maestro_tools::{ToolRegistry, WorkspaceListTool};
/// use std::sync::Arc;
///
/// let mut registry = ToolRegistry::new();
/// registry.register(Arc::new(WorkspaceListTool::new())).unwrap();
/// assert!(registry.get("workspace_list").is_some());
/// ```
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    enabled: Option<HashSet<String>>,
    table: EligibilityTable,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict dispatch to the named tools, regardless of capability match.
    #[must_use]
    pub fn with_enabled_tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled = Some(names.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_eligibility_table(mut self, table: EligibilityTable) -> Self {
        self.table = table;
        self
    }

    /// Add a tool. Names are unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        if self.get(tool.name()).is_some() {
            return Err(ToolError::Duplicate(tool.name().to_string()));
        }
        info!(
            tool = %tool.name(),
            capabilities = %tool.capabilities(),
            "Registering tool"
        );
        self.tools.push(tool);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Result<Self, ToolError> {
        self.register(tool)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Descriptors of every registered tool, in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn is_enabled(&self, name: &str) -> bool {
        self.enabled
            .as_ref()
            .is_none_or(|enabled| enabled.contains(name))
    }

    fn eligible_tools(&self, kind: RequestKind) -> Vec<Arc<dyn Tool>> {
        self.tools
            .iter()
            .filter(|tool| self.is_enabled(tool.name()))
            .filter(|tool| self.table.is_eligible(kind, tool.capabilities()))
            .filter(|tool| {
                let available = tool.is_available();
                if !available {
                    debug!(tool = %tool.name(), "Skipping unavailable tool");
                }
                available
            })
            .cloned()
            .collect()
    }

    /// Tools eligible for `kind`, in registration order.
    pub fn eligible_for(&self, kind: RequestKind) -> Vec<ToolDescriptor> {
        self.eligible_tools(kind)
            .iter()
            .map(|t| t.descriptor().clone())
            .collect()
    }

    /// Invoke one tool by name, bounded by the context timeout.
    ///
    /// Panics inside the tool are caught and reported as
    /// [`ToolError::Panicked`].
    pub async fn invoke(
        &self,
        name: &str,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        invoke_tool(tool.as_ref(), args, ctx).await
    }

    /// Invoke every eligible tool sequentially and record each outcome.
    ///
    /// A failing tool is recorded and never stops the remaining tools.
    pub async fn dispatch_all(
        &self,
        kind: RequestKind,
        args: &serde_json::Value,
        ctx: &ToolContext,
    ) -> Vec<ToolResultRecord> {
        let tools = self.eligible_tools(kind);
        let mut records = Vec::with_capacity(tools.len());

        for tool in tools {
            let started = Instant::now();
            let outcome = invoke_tool(tool.as_ref(), args.clone(), ctx).await;
            let duration_millis = started.elapsed().as_millis() as u64;

            let record = match outcome {
                Ok(value) => {
                    debug!(
                        request_id = %ctx.request_id,
                        tool = %tool.name(),
                        duration_ms = duration_millis,
                        "Tool completed"
                    );
                    ToolResultRecord::success(tool.name(), value, duration_millis)
                }
                Err(err) => {
                    let tool_error_code = err.error_code();
                    let retryable = err.is_retryable();
                    let (failure, record) = failure_record(tool.name(), err, duration_millis);
                    warn!(
                        request_id = %ctx.request_id,
                        error_code = failure.error_code(),
                        tool_error_code,
                        retryable,
                        error = %failure,
                        "Tool failed"
                    );
                    record
                }
            };
            records.push(record);
        }

        records
    }
}

/// The record keeps the tool's own message; the `ToolExecution` error names
/// the tool.
fn failure_record(
    tool: &str,
    err: ToolError,
    duration_millis: u64,
) -> (OrchestratorError, ToolResultRecord) {
    let record = ToolResultRecord::failure(tool, err.to_string(), duration_millis);
    (into_orchestrator_error(tool, err), record)
}

async fn invoke_tool(
    tool: &dyn Tool,
    args: serde_json::Value,
    ctx: &ToolContext,
) -> Result<serde_json::Value, ToolError> {
    let call = AssertUnwindSafe(tool.invoke(args, ctx)).catch_unwind();
    match tokio::time::timeout(ctx.timeout(), call).await {
        Ok(Ok(result)) => result,
        Ok(Err(_panic)) => Err(ToolError::Panicked(tool.name().to_string())),
        Err(_elapsed) => Err(ToolError::Timeout {
            tool: tool.name().to_string(),
            duration_ms: ctx.timeout_millis,
        }),
    }
}
