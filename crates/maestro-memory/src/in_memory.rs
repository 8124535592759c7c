//! Transient memory store.

use async_trait::async_trait;
use dashmap::DashMap;
use maestro_core::{ConversationEntry, RequestId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::error::MemoryError;
use crate::relevance;
use crate::store::{
    KnowledgeEntry, KnowledgeSnippet, MemoryStore, MemoryUsage, conversation_source,
};

/// Default cap on stored knowledge entries; the oldest are evicted first.
pub const DEFAULT_MAX_KNOWLEDGE_ENTRIES: usize = 1_000;

/// Serializable image of a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    #[serde(default)]
    pub conversations: BTreeMap<RequestId, Vec<ConversationEntry>>,
    #[serde(default)]
    pub knowledge: Vec<KnowledgeEntry>,
}

/// Fast, process-local memory store.
///
/// Conversations live in a concurrent map so unrelated requests never
/// contend; knowledge is a single ordered list guarded by an `RwLock` so
/// search ties resolve by insertion order. All data is lost when the process
/// terminates; see [`FileMemoryStore`](crate::FileMemoryStore) for a
/// persistent variant.
///
/// ```rust
/// use maestro_core::RequestId;
/// use maestro_memory::{InMemoryStore, MemoryStore};
///
/// # tokio_test::block_on(async {
/// let store = InMemoryStore::new();
/// let id = RequestId::parse("r1").unwrap();
/// store.append_interaction(&id, "hello", "hi there").await.unwrap();
/// assert_eq!(store.get_history(&id).await.unwrap().len(), 2);
/// # });
/// ```
#[derive(Clone)]
pub struct InMemoryStore {
    conversations: Arc<DashMap<RequestId, Vec<ConversationEntry>>>,
    knowledge: Arc<RwLock<Vec<KnowledgeEntry>>>,
    max_knowledge_entries: usize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(DashMap::new()),
            knowledge: Arc::new(RwLock::new(Vec::new())),
            max_knowledge_entries: DEFAULT_MAX_KNOWLEDGE_ENTRIES,
        }
    }

    #[must_use]
    pub fn with_max_knowledge_entries(mut self, max: usize) -> Self {
        self.max_knowledge_entries = max.max(1);
        self
    }

    /// Rebuild a store from a snapshot.
    pub fn from_snapshot(snapshot: MemorySnapshot) -> Self {
        let store = Self::new();
        for (id, entries) in snapshot.conversations {
            store.conversations.insert(id, entries);
        }
        if let Ok(mut knowledge) = store.knowledge.write() {
            *knowledge = snapshot.knowledge;
        }
        store
    }

    pub fn snapshot(&self) -> Result<MemorySnapshot, MemoryError> {
        let conversations = self
            .conversations
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let knowledge = self.read_knowledge()?.clone();
        Ok(MemorySnapshot {
            conversations,
            knowledge,
        })
    }

    fn read_knowledge(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, Vec<KnowledgeEntry>>, MemoryError> {
        self.knowledge
            .read()
            .map_err(|e| MemoryError::LockPoisoned(e.to_string()))
    }

    fn push_knowledge(&self, entry: KnowledgeEntry) -> Result<(), MemoryError> {
        let mut knowledge = self
            .knowledge
            .write()
            .map_err(|e| MemoryError::LockPoisoned(e.to_string()))?;
        knowledge.push(entry);
        if knowledge.len() > self.max_knowledge_entries {
            let excess = knowledge.len() - self.max_knowledge_entries;
            knowledge.drain(..excess);
        }
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn append_interaction(
        &self,
        conversation_id: &RequestId,
        user_message: &str,
        assistant_message: &str,
    ) -> Result<(), MemoryError> {
        {
            let mut history = self
                .conversations
                .entry(conversation_id.clone())
                .or_default();
            history.push(ConversationEntry::user(user_message));
            history.push(ConversationEntry::assistant(assistant_message));
        }

        self.push_knowledge(KnowledgeEntry::new(
            format!("{}\n{}", user_message, assistant_message),
            conversation_source(conversation_id),
        ))?;

        tracing::debug!(
            conversation_id = %conversation_id,
            "Appended interaction"
        );
        Ok(())
    }

    async fn get_history(
        &self,
        conversation_id: &RequestId,
    ) -> Result<Vec<ConversationEntry>, MemoryError> {
        Ok(self
            .conversations
            .get(conversation_id)
            .map(|entries| entries.value().clone())
            .unwrap_or_default())
    }

    async fn search_relevant_with_threshold(
        &self,
        query: &str,
        limit: usize,
        threshold: f64,
    ) -> Result<Vec<KnowledgeSnippet>, MemoryError> {
        let knowledge = self.read_knowledge()?;
        let ranked = relevance::rank(
            query,
            knowledge.iter().map(|k| k.content.as_str()),
            threshold,
            limit,
        );
        Ok(ranked
            .into_iter()
            .map(|(index, score)| KnowledgeSnippet {
                content: knowledge[index].content.clone(),
                relevance_score: score,
                source: knowledge[index].source.clone(),
            })
            .collect())
    }

    async fn add_knowledge(&self, content: &str, source: &str) -> Result<(), MemoryError> {
        self.push_knowledge(KnowledgeEntry::new(content, source))
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.conversations.clear();
        self.knowledge
            .write()
            .map_err(|e| MemoryError::LockPoisoned(e.to_string()))?
            .clear();
        tracing::info!("Cleared memory store");
        Ok(())
    }

    async fn usage(&self) -> MemoryUsage {
        let mut usage = MemoryUsage {
            conversations: self.conversations.len(),
            ..Default::default()
        };
        for entry in self.conversations.iter() {
            usage.messages += entry.value().len();
            usage.approx_bytes += entry.value().iter().map(|m| m.content.len()).sum::<usize>();
        }
        if let Ok(knowledge) = self.knowledge.read() {
            usage.knowledge_entries = knowledge.len();
            usage.approx_bytes += knowledge.iter().map(|k| k.content.len()).sum::<usize>();
        }
        usage
    }
}
