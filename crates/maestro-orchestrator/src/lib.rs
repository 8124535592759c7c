//! # Maestro Orchestrator
//!
//! Drives a request through model selection, context assembly, tool dispatch
//! and the model call, then records the exchange and reports the outcome.
//!
//! ## Request lifecycle
//!
//! ```text
//! submitted -> Running -> Completed | Failed | Cancelled
//! ```
//!
//! A request enters `Running` when it is registered in the in-flight map and
//! leaves it through a drop guard that deregisters it and publishes
//! `RequestEnded`, whichever way execution ends. A request only counts as
//! `Completed` if it leaves the in-flight map itself; once `cancel` has
//! removed it, it ends `Cancelled` even if the model already answered.
//!
//! ## Components
//!
//! - [`RequestOrchestrator`]: `execute`, `cancel`, `status`
//! - [`EventBus`]: broadcast of [`OrchestratorEvent`]s
//! - [`OrchestratorConfig`]: timeouts, tool filter, relevance settings, profiles
//! - [`ProfileTable`]: per-kind system prompt, temperature and token budget

pub mod config;
pub mod events;
mod inflight;
pub mod orchestrator;
pub mod profiles;

pub use config::{ConfigError, OrchestratorConfig, OrchestratorConfigBuilder};
pub use events::{EventBus, OrchestratorEvent};
pub use orchestrator::{RequestOrchestrator, StatusSnapshot};
pub use profiles::{Profile, ProfileOverride, ProfileTable};
