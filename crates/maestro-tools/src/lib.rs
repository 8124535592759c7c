//! # Maestro Tools
//!
//! Capability-tagged tools and the registry that dispatches them.
//!
//! A request kind maps to a set of required capability tags; every registered
//! tool whose tags intersect that set is invoked, one after another, and each
//! outcome is recorded. Tool failures are data, never errors of the request.

/// Request kind → required capability table.
pub mod eligibility;
/// Registry, eligibility filtering and sequential dispatch.
pub mod registry;
/// Built-in tools.
pub mod standard;
/// The `Tool` trait and its context/error types.
pub mod tool;

pub use eligibility::EligibilityTable;
pub use registry::ToolRegistry;
pub use standard::WorkspaceListTool;
pub use tool::{Tool, ToolContext, ToolDescriptor, ToolError, into_orchestrator_error};
