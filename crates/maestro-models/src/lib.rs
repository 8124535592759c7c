//! # Maestro Models
//!
//! Model providers, the registry that lists and calls them, and the policy
//! that picks one model per request.

pub mod provider;
pub mod registry;
pub mod selection;

pub use provider::{ModelProvider, ProviderError};
pub use registry::ModelRegistry;
pub use selection::SelectionPolicy;
pub use tokio_util::sync::CancellationToken;
