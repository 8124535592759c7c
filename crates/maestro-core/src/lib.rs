//! # Maestro Core
//!
//! Core types shared by every Maestro crate: validated request identifiers,
//! the capability tag vocabulary, request/response values, model descriptors
//! and the orchestrator error taxonomy.
//!
//! Nothing in this crate performs I/O. The registries and the orchestrator
//! live in their own crates and exchange the values defined here.

pub mod capability;
pub mod conversation;
pub mod error;
pub mod identifiers;
pub mod model;
pub mod request;
pub mod response;

pub use capability::{Capability, CapabilitySet, EmptyCapabilitySet, UnknownCapability};
pub use conversation::{ConversationEntry, MessageRole};
pub use error::{OrchestratorError, OrchestratorResult};
pub use identifiers::{IdValidationError, RequestId};
pub use model::{ChatMessage, ModelCall, ModelDescriptor, ModelKind, ModelOutput};
pub use request::{
    Request, RequestBuilder, RequestContext, RequestKind, RequestOptions, UnknownRequestKind,
};
pub use response::{RequestState, Response, ResponseMetadata, ToolResultRecord};
