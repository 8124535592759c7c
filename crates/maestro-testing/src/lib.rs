//! # Maestro Testing
//!
//! Test doubles for the Maestro crates.
//!
//! - **Mock Tools**: capability-tagged tools with scripted responses and call tracking
//! - **Mock Providers**: model providers with scripted models, replies, delays and failures
//! - **Event Recording**: collect broadcast lifecycle events for assertions
//!
//! ## Usage
//!
//! ```rust
//! use maestro_core::Capability;
//! use maestro_testing::{MockProvider, MockTool};
//! use serde_json::json;
//!
//! let provider = MockProvider::new("local")
//!     .with_model_named("codellama")
//!     .with_reply("Add a null check before dereferencing.");
//! let tool = MockTool::new("lint", [Capability::Code])
//!     .with_default_response(json!("no warnings"));
//!
//! assert_eq!(provider.call_count(), 0);
//! assert_eq!(tool.call_count(), 0);
//! ```

/// Broadcast event recorder
pub mod events;
/// Mock model provider
pub mod mock_provider;
/// Mock tools for predictable testing
pub mod mock_tools;

pub use events::EventRecorder;
pub use mock_provider::MockProvider;
pub use mock_tools::MockTool;
