//! # Maestro Memory
//!
//! Conversation history and knowledge storage used for context assembly.
//!
//! - [`MemoryStore`]: the async contract the orchestrator consumes
//! - [`InMemoryStore`]: process-local store
//! - [`FileMemoryStore`]: JSON file persistence with atomic writes
//! - [`relevance`]: word-overlap scoring shared by every store

pub mod error;
pub mod file;
pub mod in_memory;
pub mod relevance;
pub mod store;

pub use error::MemoryError;
pub use file::FileMemoryStore;
pub use in_memory::{DEFAULT_MAX_KNOWLEDGE_ENTRIES, InMemoryStore, MemorySnapshot};
pub use relevance::{DEFAULT_KNOWLEDGE_LIMIT, DEFAULT_RELEVANCE_THRESHOLD};
pub use store::{KnowledgeEntry, KnowledgeSnippet, MemoryStore, MemoryUsage, conversation_source};
