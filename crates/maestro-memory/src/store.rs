//! The memory store contract consumed by the orchestrator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use maestro_core::{ConversationEntry, RequestId};
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;
use crate::relevance::DEFAULT_RELEVANCE_THRESHOLD;

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSnippet {
    pub content: String,
    pub relevance_score: f64,
    pub source: String,
}

/// A stored piece of knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub content: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeEntry {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            created_at: Utc::now(),
        }
    }
}

/// Approximate footprint of a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub conversations: usize,
    pub messages: usize,
    pub knowledge_entries: usize,
    /// Sum of stored content lengths.
    pub approx_bytes: usize,
}

/// Source label for knowledge extracted from a conversation.
pub fn conversation_source(conversation_id: &RequestId) -> String {
    format!("conversation:{}", conversation_id)
}

/// Conversation history and knowledge, keyed by request id.
///
/// Histories are append-only; only [`MemoryStore::clear`] removes entries.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Append a user/assistant exchange to the conversation and extract it
    /// into searchable knowledge.
    async fn append_interaction(
        &self,
        conversation_id: &RequestId,
        user_message: &str,
        assistant_message: &str,
    ) -> Result<(), MemoryError>;

    /// Messages of the conversation in append order. Empty for unknown ids.
    async fn get_history(
        &self,
        conversation_id: &RequestId,
    ) -> Result<Vec<ConversationEntry>, MemoryError>;

    /// Ranked snippets scoring at least `threshold`, at most `limit`.
    async fn search_relevant_with_threshold(
        &self,
        query: &str,
        limit: usize,
        threshold: f64,
    ) -> Result<Vec<KnowledgeSnippet>, MemoryError>;

    /// [`search_relevant_with_threshold`](Self::search_relevant_with_threshold)
    /// at the default threshold.
    async fn search_relevant(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<KnowledgeSnippet>, MemoryError> {
        self.search_relevant_with_threshold(query, limit, DEFAULT_RELEVANCE_THRESHOLD)
            .await
    }

    async fn add_knowledge(&self, content: &str, source: &str) -> Result<(), MemoryError>;

    /// Remove every conversation and knowledge entry.
    async fn clear(&self) -> Result<(), MemoryError>;

    async fn usage(&self) -> MemoryUsage;
}
