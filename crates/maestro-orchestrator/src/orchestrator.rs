//! The request orchestrator.

use futures::join;
use maestro_core::{
    ChatMessage, ConversationEntry, ModelCall, ModelDescriptor, ModelOutput, OrchestratorError,
    OrchestratorResult, Request, RequestId, RequestState, Response, ResponseMetadata,
    ToolResultRecord,
};
use maestro_memory::{KnowledgeSnippet, MemoryStore, MemoryUsage};
use maestro_models::{ModelRegistry, SelectionPolicy};
use maestro_tools::{ToolContext, ToolRegistry};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::OrchestratorConfig;
use crate::events::{EventBus, OrchestratorEvent};
use crate::inflight::{InFlightGuard, InFlightRegistry};

/// Point-in-time view of the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub is_processing: bool,
    /// Ids of in-flight requests, sorted.
    pub active_requests: Vec<RequestId>,
    /// Name of the most recently selected model.
    pub current_model: Option<String>,
    pub memory_usage: MemoryUsage,
}

/// Context fetched from memory for one request.
#[derive(Debug, Default)]
struct AssembledContext {
    history: Vec<ConversationEntry>,
    knowledge: Vec<KnowledgeSnippet>,
}

/// Everything a run produced, successful or not.
struct RunOutcome {
    model: Option<ModelDescriptor>,
    tool_results: Vec<ToolResultRecord>,
    result: OrchestratorResult<ModelOutput>,
}

impl RunOutcome {
    fn failed(model: Option<ModelDescriptor>, err: OrchestratorError) -> Self {
        Self {
            model,
            tool_results: Vec::new(),
            result: Err(err),
        }
    }
}

/// Drives requests from submission to response.
///
/// The orchestrator owns the in-flight map and the event bus; its three
/// collaborators are injected at construction and shared read-only between
/// concurrent executions.
///
/// ```rust,no_run
/// use maestro_core::{Request, RequestKind};
/// use maestro_memory::InMemoryStore;
/// use maestro_models::ModelRegistry;
/// use maestro_orchestrator::{OrchestratorConfig, RequestOrchestrator};
/// use maestro_tools::ToolRegistry;
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let orchestrator = RequestOrchestrator::new(
///     OrchestratorConfig::default(),
///     Arc::new(ModelRegistry::new()),
///     Arc::new(ToolRegistry::new()),
///     Arc::new(InMemoryStore::new()),
/// );
///
/// let response = orchestrator
///     .execute(Request::builder(RequestKind::Chat, "hello").build())
///     .await?;
/// assert!(response.error.is_some()); // no providers registered
/// # Ok(())
/// # }
/// ```
pub struct RequestOrchestrator {
    config: OrchestratorConfig,
    models: Arc<ModelRegistry>,
    tools: Arc<ToolRegistry>,
    memory: Arc<dyn MemoryStore>,
    policy: SelectionPolicy,
    inflight: InFlightRegistry,
    events: EventBus,
}

impl RequestOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        models: Arc<ModelRegistry>,
        tools: Arc<ToolRegistry>,
        memory: Arc<dyn MemoryStore>,
    ) -> Self {
        let tools = match &config.enabled_tools {
            Some(enabled) => Arc::new((*tools).clone().with_enabled_tools(enabled.clone())),
            None => tools,
        };

        let policy = config
            .model_preferences
            .iter()
            .fold(SelectionPolicy::default(), |policy, (kind, names)| {
                policy.with_preferences(*kind, names.clone())
            });

        let events = EventBus::new(config.event_capacity);

        Self {
            config,
            models,
            tools,
            memory,
            policy,
            inflight: InFlightRegistry::default(),
            events,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.events.subscribe()
    }

    /// Run one request to completion.
    ///
    /// Returns `Err` only for [`OrchestratorError::DuplicateRequest`], before
    /// any state changes or events. Every admitted request resolves to
    /// `Ok(Response)`; failures are carried in `Response::error`.
    pub async fn execute(&self, request: Request) -> OrchestratorResult<Response> {
        let (token, generation) = self.inflight.register(&request.id)?;
        let guard = InFlightGuard::new(&self.inflight, &self.events, request.id.clone(), generation);

        let span = info_span!(
            "request",
            request_id = %request.id,
            kind = %request.kind
        );

        async move {
            let started = Instant::now();
            info!("Request started");
            self.events.publish(OrchestratorEvent::RequestStarted {
                request: request.clone(),
            });

            let RunOutcome {
                model,
                tool_results,
                result,
            } = self.run(&request, &token).await;

            let settled = match result {
                Ok(output) => {
                    self.settle(&request, &token, generation, output, &tool_results)
                        .await
                }
                Err(err) => Err(err),
            };
            let duration_millis = started.elapsed().as_millis() as u64;

            let (response, state) = match settled {
                Ok((content, token_count)) => {
                    let response = Response {
                        request_id: request.id.clone(),
                        content,
                        tool_results: non_empty(tool_results),
                        error: None,
                        metadata: metadata(model.as_ref(), token_count, duration_millis),
                    };
                    info!(
                        token_count,
                        duration_ms = duration_millis,
                        "Response received"
                    );
                    self.events.publish(OrchestratorEvent::ResponseReceived {
                        response: response.clone(),
                    });
                    (response, RequestState::Completed)
                }
                Err(err) => {
                    let state = if err.is_cancellation() {
                        RequestState::Cancelled
                    } else {
                        RequestState::Failed
                    };
                    warn!(
                        error_code = err.error_code(),
                        retryable = err.is_retryable(),
                        error = %err,
                        "Request failed"
                    );
                    let response = Response::failure(
                        request.id.clone(),
                        err.to_string(),
                        metadata(model.as_ref(), 0, duration_millis),
                        non_empty(tool_results),
                    );
                    (response, state)
                }
            };

            guard.finish(state);
            Ok(response)
        }
        .instrument(span)
        .await
    }

    /// Cancel an in-flight request. Returns false (and does nothing) if `id`
    /// is not in flight, including once its response has been settled.
    pub fn cancel(&self, id: &RequestId) -> bool {
        let cancelled = self.inflight.cancel(id);
        if cancelled {
            info!(request_id = %id, "Request cancelled");
        } else {
            debug!(request_id = %id, "Cancel ignored, request not in flight");
        }
        cancelled
    }

    pub async fn status(&self) -> StatusSnapshot {
        let snapshot = self.inflight.snapshot();
        StatusSnapshot {
            is_processing: !snapshot.active.is_empty(),
            active_requests: snapshot.active,
            current_model: snapshot.current_model,
            memory_usage: self.memory.usage().await,
        }
    }

    async fn run(&self, request: &Request, token: &CancellationToken) -> RunOutcome {
        let model = match self.select_model(request).await {
            Ok(model) => model,
            Err(err) => return RunOutcome::failed(None, err),
        };
        info!(model = %model.name, provider = %model.provider_name, "Model selected");
        self.inflight.set_current_model(&model.name);

        let tool_args = serde_json::json!({
            "kind": request.kind,
            "content": request.content,
            "context": request.context,
        });
        let tool_ctx = self.tool_context(request);

        let (context, tool_results) = join!(
            self.assemble_context(request),
            self.tools.dispatch_all(request.kind, &tool_args, &tool_ctx)
        );

        let call = self.build_call(request, &model, &context);
        let timeout = request
            .timeout_millis()
            .map(Duration::from_millis)
            .unwrap_or(self.config.default_timeout);

        let result = self.models.call(&model, &call, token, timeout).await;

        RunOutcome {
            model: Some(model),
            tool_results,
            result,
        }
    }

    async fn select_model(&self, request: &Request) -> OrchestratorResult<ModelDescriptor> {
        let provider = request.preferred_provider();
        let preferred = request.preferred_model().or_else(|| {
            provider.and_then(|p| self.config.default_models.get(p).map(String::as_str))
        });
        self.models
            .select(&self.policy, request.kind, preferred, provider)
            .await
    }

    fn tool_context(&self, request: &Request) -> ToolContext {
        let ctx = ToolContext::new(request.id.clone(), self.config.working_directory.clone())
            .with_timeout_millis(self.config.tool_timeout.as_millis() as u64);
        match request.workspace_root() {
            Some(root) => ctx.with_workspace_root(PathBuf::from(root)),
            None => ctx,
        }
    }

    /// History and knowledge, fetched concurrently. Read failures degrade to
    /// empty context.
    async fn assemble_context(&self, request: &Request) -> AssembledContext {
        let (history, knowledge) = join!(
            self.memory.get_history(&request.id),
            self.memory.search_relevant_with_threshold(
                &request.content,
                self.config.knowledge_limit,
                self.config.relevance_threshold,
            )
        );

        let history = history.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load conversation history");
            Vec::new()
        });
        let knowledge = knowledge.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to search knowledge");
            Vec::new()
        });
        debug!(
            history = history.len(),
            knowledge = knowledge.len(),
            "Context assembled"
        );

        AssembledContext { history, knowledge }
    }

    fn build_call(
        &self,
        request: &Request,
        model: &ModelDescriptor,
        context: &AssembledContext,
    ) -> ModelCall {
        let profile = self.config.profiles.for_kind(request.kind);

        let mut system = profile.system_prompt;
        if let Some(ctx) = &request.context {
            if let Some(path) = &ctx.file_path {
                system.push_str(&format!("\n\nCurrent file: {path}"));
            }
            if let Some(language) = &ctx.language {
                system.push_str(&format!("\nLanguage: {language}"));
            }
        }
        if !context.knowledge.is_empty() {
            system.push_str("\n\nRelevant context:");
            for snippet in &context.knowledge {
                system.push_str(&format!("\n- [{}] {}", snippet.source, snippet.content));
            }
        }

        let mut user = request.content.clone();
        if let Some(selection) = request
            .context
            .as_ref()
            .and_then(|c| c.selection_text.as_deref())
        {
            user.push_str(&format!("\n\nSelected code:\n```\n{selection}\n```"));
        }

        let mut messages = Vec::with_capacity(context.history.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(context.history.iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(user));

        ModelCall {
            model: model.name.clone(),
            messages,
            temperature: profile.temperature,
            max_tokens: profile.max_tokens,
            streaming: request.options.as_ref().is_some_and(|o| o.streaming),
        }
    }

    /// Enrich the model output, persist the exchange and take the request
    /// out of flight.
    ///
    /// Fails with `Cancelled` if the request was cancelled at any point
    /// before it left the in-flight map; a cancelled request is not
    /// persisted unless the cancel arrived during the write.
    async fn settle(
        &self,
        request: &Request,
        token: &CancellationToken,
        generation: u64,
        output: ModelOutput,
        tool_results: &[ToolResultRecord],
    ) -> OrchestratorResult<(String, u64)> {
        if token.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }

        let token_count = output.effective_token_count();
        let content = enrich(output.content, tool_results);
        self.persist(request, &content).await;

        if !self.inflight.deregister(&request.id, generation) {
            return Err(OrchestratorError::Cancelled);
        }
        Ok((content, token_count))
    }

    /// Best-effort, bounded by `persist_timeout`.
    async fn persist(&self, request: &Request, content: &str) {
        let append = self
            .memory
            .append_interaction(&request.id, &request.content, content);

        let err = match tokio::time::timeout(self.config.persist_timeout, append).await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => OrchestratorError::from(e),
            Err(_elapsed) => OrchestratorError::MemoryPersistence(format!(
                "timed out after {}ms",
                self.config.persist_timeout.as_millis()
            )),
        };
        warn!(error_code = err.error_code(), error = %err, "Failed to persist interaction");
    }
}

fn metadata(
    model: Option<&ModelDescriptor>,
    token_count: u64,
    duration_millis: u64,
) -> ResponseMetadata {
    ResponseMetadata {
        model_name: model.map(|m| m.name.clone()),
        provider_name: model.map(|m| m.provider_name.clone()),
        token_count,
        duration_millis,
    }
}

fn non_empty(records: Vec<ToolResultRecord>) -> Option<Vec<ToolResultRecord>> {
    (!records.is_empty()).then_some(records)
}

/// Append tool summaries to the model output.
fn enrich(content: String, tool_results: &[ToolResultRecord]) -> String {
    if tool_results.is_empty() {
        return content;
    }
    let summaries: Vec<String> = tool_results.iter().map(ToolResultRecord::summary).collect();
    format!("{}\n\nTool results:\n{}", content, summaries.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::{Capability, CapabilitySet, ModelKind, RequestKind};
    use maestro_memory::InMemoryStore;
    use maestro_testing::{MockProvider, MockTool};
    use serde_json::json;

    fn codellama() -> ModelDescriptor {
        ModelDescriptor::new(
            "codellama",
            "local",
            ModelKind::Local,
            CapabilitySet::new([Capability::Debug, Capability::Code]).unwrap(),
            16_384,
        )
    }

    fn orchestrator_with(
        provider: MockProvider,
        tools: ToolRegistry,
        memory: Arc<dyn MemoryStore>,
    ) -> RequestOrchestrator {
        let models = ModelRegistry::new()
            .with_provider(Arc::new(provider))
            .unwrap();
        RequestOrchestrator::new(
            OrchestratorConfig::default(),
            Arc::new(models),
            Arc::new(tools),
            memory,
        )
    }

    #[test]
    fn test_enrich_appends_summaries() {
        let records = vec![
            ToolResultRecord::success("lint", json!("clean"), 3),
            ToolResultRecord::failure("shell", "exit 1", 5),
        ];
        assert_eq!(
            enrich("Answer".to_string(), &records),
            "Answer\n\nTool results:\n- lint: clean\n- shell: failed (exit 1)"
        );
        assert_eq!(enrich("Answer".to_string(), &[]), "Answer");
    }

    #[tokio::test]
    async fn test_build_call_uses_profile_history_and_knowledge() {
        let memory = Arc::new(InMemoryStore::new());
        memory
            .add_knowledge("null pointer checks belong in the parser", "notes")
            .await
            .unwrap();
        let orchestrator = orchestrator_with(
            MockProvider::new("local").with_model(codellama()),
            ToolRegistry::new(),
            memory,
        );

        let request = Request::builder(RequestKind::Debug, "fix null pointer")
            .file_path("src/parser.rs")
            .build();
        let context = AssembledContext {
            history: vec![
                ConversationEntry::user("earlier question"),
                ConversationEntry::assistant("earlier answer"),
            ],
            knowledge: orchestrator
                .memory
                .search_relevant("fix null pointer", 10)
                .await
                .unwrap(),
        };

        let call = orchestrator.build_call(&request, &codellama(), &context);
        assert_eq!(call.model, "codellama");
        assert_eq!(call.temperature, 0.1);
        assert_eq!(call.messages.len(), 4);
        let system = call.system_prompt().unwrap();
        assert!(system.contains("Current file: src/parser.rs"));
        assert!(system.contains("[notes] null pointer checks"));
        assert_eq!(call.last_user_message(), Some("fix null pointer"));
    }

    #[tokio::test]
    async fn test_default_model_for_preferred_provider() {
        let models = ModelRegistry::new()
            .with_provider(Arc::new(
                MockProvider::new("openai")
                    .with_model_named("gpt-4o")
                    .with_model_named("gpt-4o-mini"),
            ))
            .unwrap();
        let config = OrchestratorConfig::builder()
            .default_model("openai", "gpt-4o-mini")
            .build()
            .unwrap();
        let orchestrator = RequestOrchestrator::new(
            config,
            Arc::new(models),
            Arc::new(ToolRegistry::new()),
            Arc::new(InMemoryStore::new()),
        );

        let request = Request::builder(RequestKind::Chat, "hi")
            .preferred_provider("openai")
            .build();
        let model = orchestrator.select_model(&request).await.unwrap();
        assert_eq!(model.name, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_enabled_tools_from_config() {
        let tools = ToolRegistry::new()
            .with_tool(Arc::new(MockTool::new("shell", [Capability::Terminal])))
            .unwrap()
            .with_tool(Arc::new(MockTool::new("lint", [Capability::Code])))
            .unwrap();
        let config = OrchestratorConfig::builder()
            .enabled_tools(["lint"])
            .build()
            .unwrap();
        let orchestrator = RequestOrchestrator::new(
            config,
            Arc::new(ModelRegistry::new()),
            Arc::new(tools),
            Arc::new(InMemoryStore::new()),
        );

        let names: Vec<String> = orchestrator
            .tools
            .eligible_for(RequestKind::Debug)
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["lint"]);
    }

    #[tokio::test]
    async fn test_tool_context_uses_workspace_root() {
        let orchestrator = orchestrator_with(
            MockProvider::new("local"),
            ToolRegistry::new(),
            Arc::new(InMemoryStore::new()),
        );
        let request = Request::builder(RequestKind::Command, "ls")
            .workspace_root("/repo")
            .build();
        let ctx = orchestrator.tool_context(&request);
        assert_eq!(ctx.workspace_root, Some(PathBuf::from("/repo")));
        assert_eq!(ctx.timeout_millis, 30_000);
    }
}
