//! Memory store errors.

use maestro_core::OrchestratorError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by memory stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Writing the backing file failed.
    #[error("Failed to persist memory to {path}: {details}")]
    Persistence { path: PathBuf, details: String },

    /// Reading the backing file failed.
    #[error("Failed to load memory from {path}: {details}")]
    Load { path: PathBuf, details: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl MemoryError {
    pub fn error_code(&self) -> &'static str {
        match self {
            MemoryError::Persistence { .. } => "MEMORY_PERSISTENCE_ERROR",
            MemoryError::Load { .. } => "MEMORY_LOAD_ERROR",
            MemoryError::Serialization(_) => "MEMORY_SERIALIZATION_ERROR",
            MemoryError::LockPoisoned(_) => "MEMORY_LOCK_POISONED",
        }
    }
}

impl From<serde_json::Error> for MemoryError {
    fn from(err: serde_json::Error) -> Self {
        MemoryError::Serialization(err.to_string())
    }
}

impl From<MemoryError> for OrchestratorError {
    fn from(err: MemoryError) -> Self {
        OrchestratorError::MemoryPersistence(err.to_string())
    }
}
