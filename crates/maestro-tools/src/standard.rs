//! Built-in tools.

use async_trait::async_trait;
use maestro_core::{Capability, CapabilitySet};
use std::path::{Component, Path, PathBuf};

use crate::tool::{Tool, ToolContext, ToolDescriptor, ToolError};

/// Maximum entries returned by [`WorkspaceListTool`].
pub const MAX_LISTED_ENTRIES: usize = 200;

/// Lists the files and directories under the request's workspace.
///
/// Arguments: `{"path": "src"}` (optional, relative to the workspace root).
/// Paths escaping the workspace are rejected.
#[derive(Debug)]
pub struct WorkspaceListTool {
    descriptor: ToolDescriptor,
}

impl WorkspaceListTool {
    pub fn new() -> Self {
        let capabilities = CapabilitySet::new([
            Capability::File,
            Capability::Code,
            Capability::Analysis,
            Capability::General,
        ])
        .unwrap_or_else(|_| CapabilitySet::single(Capability::File));

        let descriptor = ToolDescriptor::new(
            "workspace_list",
            "List files and directories in the workspace",
            capabilities,
        )
        .with_parameter_spec(serde_json::json!({
            "type": "object",
            "properties": { "path": { "type": "string" } }
        }));

        Self { descriptor }
    }
}

impl Default for WorkspaceListTool {
    fn default() -> Self {
        Self::new()
    }
}

/// The optional `path` argument. Other keys are ignored.
fn path_argument(args: &serde_json::Value) -> Result<Option<&str>, ToolError> {
    match args.get("path") {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(path)) => Ok(Some(path.as_str())),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "'path' must be a string, got {other}"
        ))),
    }
}

fn resolve(base: &Path, relative: Option<&str>) -> Result<PathBuf, ToolError> {
    let Some(relative) = relative else {
        return Ok(base.to_path_buf());
    };
    let relative = Path::new(relative);
    let escapes = relative
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(ToolError::InvalidArguments(format!(
            "path '{}' escapes the workspace",
            relative.display()
        )));
    }
    Ok(base.join(relative))
}

#[async_trait]
impl Tool for WorkspaceListTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, ToolError> {
        let dir = resolve(ctx.base_directory(), path_argument(&args)?)?;

        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| {
            ToolError::Execution(format!("Failed to list directory '{}': {}", dir.display(), e))
        })?;

        let mut files = Vec::new();
        let mut directories = Vec::new();
        let mut truncated = false;

        while let Some(entry) = entries.next_entry().await? {
            if files.len() + directories.len() >= MAX_LISTED_ENTRIES {
                truncated = true;
                break;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                directories.push(name);
            } else if file_type.is_file() {
                files.push(name);
            }
        }

        files.sort();
        directories.sort();

        Ok(serde_json::json!({
            "path": dir.to_string_lossy(),
            "files": files,
            "directories": directories,
            "truncated": truncated,
        }))
    }
}
