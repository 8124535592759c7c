//! The model provider contract.

use async_trait::async_trait;
use maestro_core::{ModelCall, ModelDescriptor, ModelKind, OrchestratorError};
use thiserror::Error;

/// Failures reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider cannot be reached at all.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Rate limited")]
    RateLimited { retry_after_ms: Option<u64> },

    /// Upstream returned an error status.
    #[error("Upstream error{}: {message}", status_suffix(.status))]
    Upstream { status: Option<u16>, message: String },

    #[error("Model not served by this provider: {0}")]
    UnknownModel(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Provider '{0}' is already registered")]
    Duplicate(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl ProviderError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Unavailable(_)
            | ProviderError::Connection(_)
            | ProviderError::RateLimited { .. } => true,
            ProviderError::Upstream { status, .. } => status.is_some_and(|s| s >= 500),
            _ => false,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ProviderError::Unavailable(_) => "PROVIDER_UNAVAILABLE",
            ProviderError::Connection(_) => "CONNECTION_ERROR",
            ProviderError::RateLimited { .. } => "RATE_LIMITED",
            ProviderError::Upstream { .. } => "UPSTREAM_ERROR",
            ProviderError::UnknownModel(_) => "UNKNOWN_MODEL",
            ProviderError::InvalidResponse(_) => "INVALID_RESPONSE",
            ProviderError::Duplicate(_) => "PROVIDER_DUPLICATE",
        }
    }

    /// Wrap as an orchestrator error attributed to `provider`.
    pub fn into_orchestrator_error(self, provider: &str) -> OrchestratorError {
        OrchestratorError::ModelProvider {
            provider: provider.to_string(),
            retryable: self.is_retryable(),
            message: self.to_string(),
        }
    }
}

/// A named source of models.
///
/// Providers are opaque to the orchestrator: they list what they serve and
/// answer normalized calls. Wire protocols and authentication stay inside
/// the implementation.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ModelKind;

    /// Cheap health check. Unavailable providers are skipped when listing.
    async fn is_available(&self) -> bool {
        true
    }

    /// Models currently served. Called on every selection; not cached.
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ProviderError>;

    async fn invoke(&self, call: &ModelCall) -> Result<maestro_core::ModelOutput, ProviderError>;
}
