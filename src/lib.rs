//! # Maestro
//!
//! Request orchestration for coding assistants: a request is matched to a
//! model, enriched with conversation history and relevant knowledge, handed
//! to every capability-eligible tool, and answered by the selected provider.
//!
//! This crate re-exports the workspace crates under one roof.

pub use maestro_core;
pub use maestro_memory;
pub use maestro_models;
pub use maestro_orchestrator;
pub use maestro_tools;

pub use maestro_core::{
    OrchestratorError, OrchestratorResult, Request, RequestId, RequestKind, Response,
};
pub use maestro_memory::{FileMemoryStore, InMemoryStore, MemoryStore};
pub use maestro_models::{ModelProvider, ModelRegistry, SelectionPolicy};
pub use maestro_orchestrator::{
    OrchestratorConfig, OrchestratorEvent, RequestOrchestrator, StatusSnapshot,
};
pub use maestro_tools::{Tool, ToolRegistry};
