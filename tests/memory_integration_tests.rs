//! Memory Integration Tests
//!
//! File-backed persistence through the orchestrator, persistence failures
//! and relevance search as seen by callers.

use maestro_core::{MessageRole, Request, RequestId, RequestKind};
use maestro_memory::{FileMemoryStore, InMemoryStore, MemoryStore, conversation_source};
use maestro_models::ModelRegistry;
use maestro_orchestrator::{OrchestratorConfig, RequestOrchestrator};
use maestro_testing::MockProvider;
use maestro_tools::ToolRegistry;
use proptest::prelude::*;
use rstest::rstest;
use std::sync::Arc;
use tempfile::TempDir;

fn orchestrator(memory: Arc<dyn MemoryStore>, config: OrchestratorConfig) -> RequestOrchestrator {
    let models = ModelRegistry::new()
        .with_provider(Arc::new(
            MockProvider::new("local").with_model_named("codellama"),
        ))
        .unwrap();
    RequestOrchestrator::new(config, Arc::new(models), Arc::new(ToolRegistry::new()), memory)
}

fn request(id: &str, content: &str) -> Request {
    Request::builder(RequestKind::Chat, content)
        .id(RequestId::parse(id).unwrap())
        .build()
}

#[tokio::test]
async fn test_interaction_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memory.json");

    {
        let store = Arc::new(FileMemoryStore::open(&path).await.unwrap());
        let orchestrator = orchestrator(store, OrchestratorConfig::default());
        let response = orchestrator
            .execute(request("r1", "explain lifetimes"))
            .await
            .unwrap();
        assert!(response.error.is_none());
    }

    let reopened = FileMemoryStore::open(&path).await.unwrap();
    let id = RequestId::parse("r1").unwrap();
    let history = reopened.get_history(&id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, MessageRole::User);
    assert_eq!(history[0].content, "explain lifetimes");
    assert_eq!(history[1].role, MessageRole::Assistant);

    let found = reopened.search_relevant("lifetimes", 10).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].source, conversation_source(&id));
}

#[tokio::test]
async fn test_persistence_failure_does_not_fail_request() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("memory.json");

    let store = Arc::new(FileMemoryStore::open(&path).await.unwrap());
    let orchestrator = orchestrator(store.clone(), OrchestratorConfig::default());

    let response = orchestrator
        .execute(request("r1", "hello"))
        .await
        .unwrap();

    assert!(response.error.is_none());
    assert!(!path.exists());
    // The in-memory view keeps the exchange even though the write failed.
    let history = store
        .get_history(&RequestId::parse("r1").unwrap())
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
}

#[rstest]
#[case("database error", true)]
#[case("connection", true)]
#[case("quantum physics", false)]
#[case("quantum physics database lecture", false)]
#[tokio::test]
async fn test_relevance_threshold(#[case] query: &str, #[case] found: bool) {
    let store = InMemoryStore::new();
    store
        .add_knowledge("I got a database connection error today", "notes")
        .await
        .unwrap();

    let results = store.search_relevant(query, 10).await.unwrap();
    assert_eq!(!results.is_empty(), found, "query: {query}");
}

#[tokio::test]
async fn test_exact_overlap_scores_one() {
    let store = InMemoryStore::new();
    store
        .add_knowledge("I got a database connection error today", "notes")
        .await
        .unwrap();

    let results = store.search_relevant("database error", 10).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].relevance_score, 1.0);
    assert_eq!(results[0].source, "notes");
}

#[tokio::test]
async fn test_configured_knowledge_limit_applies() {
    let store = Arc::new(InMemoryStore::new());
    for i in 0..5 {
        store
            .add_knowledge(&format!("borrow checker note {i}"), "notes")
            .await
            .unwrap();
    }
    let config = OrchestratorConfig::builder()
        .knowledge_limit(2)
        .build()
        .unwrap();
    let provider = MockProvider::new("local").with_model_named("codellama");
    let models = ModelRegistry::new()
        .with_provider(Arc::new(provider.clone()))
        .unwrap();
    let orchestrator =
        RequestOrchestrator::new(config, Arc::new(models), Arc::new(ToolRegistry::new()), store);

    orchestrator
        .execute(request("r1", "borrow checker"))
        .await
        .unwrap();

    let system = provider.last_call().unwrap().system_prompt().unwrap().to_string();
    assert_eq!(system.matches("\n- [notes]").count(), 2);
    // Ties keep insertion order.
    assert!(system.contains("borrow checker note 0"));
    assert!(system.contains("borrow checker note 1"));
}

#[tokio::test]
async fn test_clear_empties_usage() {
    let store = Arc::new(InMemoryStore::new());
    let orchestrator = orchestrator(store.clone(), OrchestratorConfig::default());
    orchestrator.execute(request("r1", "hello")).await.unwrap();
    assert_eq!(orchestrator.status().await.memory_usage.messages, 2);

    store.clear().await.unwrap();
    let usage = orchestrator.status().await.memory_usage;
    assert_eq!(usage.messages, 0);
    assert_eq!(usage.knowledge_entries, 0);
}

proptest! {
    #[test]
    fn prop_search_never_exceeds_limit(
        entries in prop::collection::vec("[a-z]{1,6}( [a-z]{1,6}){0,4}", 0..20),
        query in "[a-z]{1,6}( [a-z]{1,6}){0,2}",
        limit in 0usize..12,
    ) {
        let results = tokio_test::block_on(async {
            let store = InMemoryStore::new();
            for entry in &entries {
                store.add_knowledge(entry, "prop").await.unwrap();
            }
            store.search_relevant(&query, limit).await.unwrap()
        });

        prop_assert!(results.len() <= limit);
        for pair in results.windows(2) {
            prop_assert!(pair[0].relevance_score >= pair[1].relevance_score);
        }
        for snippet in &results {
            prop_assert!(snippet.relevance_score >= 0.3);
            prop_assert!(snippet.relevance_score <= 1.0);
        }
    }
}
