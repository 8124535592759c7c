//! Provider registry: listing, lookup and cancellable calls.

use futures::future::join_all;
use maestro_core::{
    ModelCall, ModelDescriptor, ModelOutput, OrchestratorError, OrchestratorResult, RequestKind,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::provider::{ModelProvider, ProviderError};
use crate::selection::SelectionPolicy;

/// Holds named model providers.
///
/// Listings are fetched from every provider on each query and never cached.
/// A provider that is unavailable or whose listing fails is skipped.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    providers: Vec<Arc<dyn ModelProvider>>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. Names are unique.
    pub fn register(&mut self, provider: Arc<dyn ModelProvider>) -> Result<(), ProviderError> {
        if self.provider(provider.name()).is_some() {
            return Err(ProviderError::Duplicate(provider.name().to_string()));
        }
        info!(provider = %provider.name(), kind = %provider.kind(), "Registering model provider");
        self.providers.push(provider);
        Ok(())
    }

    pub fn with_provider(mut self, provider: Arc<dyn ModelProvider>) -> Result<Self, ProviderError> {
        self.register(provider)?;
        Ok(self)
    }

    pub fn providers(&self) -> &[Arc<dyn ModelProvider>] {
        &self.providers
    }

    pub fn provider(&self, name: &str) -> Option<Arc<dyn ModelProvider>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    /// Union of every reachable provider's listing, in registration order.
    pub async fn list_available(&self) -> Vec<ModelDescriptor> {
        let listings = join_all(self.providers.iter().map(|provider| async move {
            if !provider.is_available().await {
                debug!(provider = %provider.name(), "Skipping unavailable provider");
                return Vec::new();
            }
            match provider.list_models().await {
                Ok(models) => models,
                Err(e) => {
                    warn!(
                        provider = %provider.name(),
                        error_code = e.error_code(),
                        error = %e,
                        "Failed to list models, skipping provider"
                    );
                    Vec::new()
                }
            }
        }))
        .await;

        listings.into_iter().flatten().collect()
    }

    /// First listed model with exactly this name.
    pub async fn find_model(&self, name: &str) -> Option<ModelDescriptor> {
        self.list_available()
            .await
            .into_iter()
            .find(|m| m.name == name)
    }

    /// Resolve a model for a request from the current listings.
    pub async fn select(
        &self,
        policy: &SelectionPolicy,
        kind: RequestKind,
        preferred_model: Option<&str>,
        preferred_provider: Option<&str>,
    ) -> OrchestratorResult<ModelDescriptor> {
        let models = self.list_available().await;
        policy.select(&models, kind, preferred_model, preferred_provider)
    }

    /// Invoke the provider serving `model`.
    ///
    /// Fails with [`OrchestratorError::Cancelled`] as soon as `cancel` fires
    /// and with [`OrchestratorError::Timeout`] once `timeout` elapses. The
    /// provider future is dropped in both cases.
    pub async fn call(
        &self,
        model: &ModelDescriptor,
        call: &ModelCall,
        cancel: &CancellationToken,
        timeout: Duration,
    ) -> OrchestratorResult<ModelOutput> {
        let provider = self
            .provider(&model.provider_name)
            .ok_or_else(|| OrchestratorError::ModelNotFound(model.name.clone()))?;

        if cancel.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(OrchestratorError::Cancelled),
            outcome = tokio::time::timeout(timeout, provider.invoke(call)) => match outcome {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(e)) => Err(e.into_orchestrator_error(provider.name())),
                Err(_elapsed) => Err(OrchestratorError::Timeout {
                    duration_ms: timeout.as_millis() as u64,
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use maestro_core::{Capability, CapabilitySet, ChatMessage, ModelKind};

    struct FakeProvider {
        name: &'static str,
        models: Vec<&'static str>,
        available: bool,
        list_fails: bool,
        delay: Duration,
        reply: Result<&'static str, ProviderError>,
    }

    impl FakeProvider {
        fn new(name: &'static str, models: Vec<&'static str>) -> Self {
            Self {
                name,
                models,
                available: true,
                list_fails: false,
                delay: Duration::ZERO,
                reply: Ok("ok"),
            }
        }
    }

    #[async_trait]
    impl ModelProvider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn kind(&self) -> ModelKind {
            ModelKind::Remote
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ProviderError> {
            if self.list_fails {
                return Err(ProviderError::Connection("refused".to_string()));
            }
            Ok(self
                .models
                .iter()
                .map(|m| {
                    ModelDescriptor::new(
                        *m,
                        self.name,
                        ModelKind::Remote,
                        CapabilitySet::single(Capability::Chat),
                        4_096,
                    )
                })
                .collect())
        }

        async fn invoke(&self, _call: &ModelCall) -> Result<ModelOutput, ProviderError> {
            tokio::time::sleep(self.delay).await;
            self.reply.clone().map(ModelOutput::text)
        }
    }

    fn call_for(model: &str) -> ModelCall {
        ModelCall {
            model: model.to_string(),
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.7,
            max_tokens: 256,
            streaming: false,
        }
    }

    #[tokio::test]
    async fn test_listing_skips_failing_and_unavailable_providers() {
        let mut broken = FakeProvider::new("broken", vec!["x"]);
        broken.list_fails = true;
        let mut offline = FakeProvider::new("offline", vec!["y"]);
        offline.available = false;

        let registry = ModelRegistry::new()
            .with_provider(Arc::new(broken))
            .unwrap()
            .with_provider(Arc::new(FakeProvider::new("openai", vec!["gpt-4o", "gpt-4o-mini"])))
            .unwrap()
            .with_provider(Arc::new(offline))
            .unwrap();

        let names: Vec<String> = registry
            .list_available()
            .await
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["gpt-4o", "gpt-4o-mini"]);
        assert!(registry.find_model("gpt-4o-mini").await.is_some());
        assert!(registry.find_model("y").await.is_none());
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let mut registry = ModelRegistry::new();
        registry
            .register(Arc::new(FakeProvider::new("local", vec![])))
            .unwrap();
        let err = registry
            .register(Arc::new(FakeProvider::new("local", vec![])))
            .unwrap_err();
        assert_eq!(err, ProviderError::Duplicate("local".to_string()));
        assert_eq!(registry.providers().len(), 1);
    }

    #[tokio::test]
    async fn test_select_uses_live_listing() {
        let registry = ModelRegistry::new()
            .with_provider(Arc::new(FakeProvider::new("local", vec!["codellama"])))
            .unwrap();
        let model = registry
            .select(&SelectionPolicy::default(), RequestKind::Debug, None, None)
            .await
            .unwrap();
        assert_eq!(model.name, "codellama");
    }

    #[tokio::test]
    async fn test_call_success_and_provider_error() {
        let mut failing = FakeProvider::new("flaky", vec!["m"]);
        failing.reply = Err(ProviderError::Upstream {
            status: Some(502),
            message: "bad gateway".to_string(),
        });
        let registry = ModelRegistry::new()
            .with_provider(Arc::new(FakeProvider::new("local", vec!["codellama"])))
            .unwrap()
            .with_provider(Arc::new(failing))
            .unwrap();
        let models = registry.list_available().await;
        let token = CancellationToken::new();

        let out = registry
            .call(&models[0], &call_for("codellama"), &token, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(out.content, "ok");

        let err = registry
            .call(&models[1], &call_for("m"), &token, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), "MODEL_PROVIDER_ERROR");
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_times_out() {
        let mut slow = FakeProvider::new("slow", vec!["m"]);
        slow.delay = Duration::from_secs(60);
        let registry = ModelRegistry::new().with_provider(Arc::new(slow)).unwrap();
        let model = registry.find_model("m").await.unwrap();

        let err = registry
            .call(&model, &call_for("m"), &CancellationToken::new(), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert_eq!(err, OrchestratorError::Timeout { duration_ms: 100 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_cancelled_mid_flight() {
        let mut slow = FakeProvider::new("slow", vec!["m"]);
        slow.delay = Duration::from_secs(60);
        let registry = ModelRegistry::new().with_provider(Arc::new(slow)).unwrap();
        let model = registry.find_model("m").await.unwrap();

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = registry
            .call(&model, &call_for("m"), &token, Duration::from_secs(120))
            .await
            .unwrap_err();
        assert_eq!(err, OrchestratorError::Cancelled);
    }

    #[tokio::test]
    async fn test_call_unknown_provider() {
        let registry = ModelRegistry::new();
        let model = ModelDescriptor::new(
            "ghost",
            "nowhere",
            ModelKind::Local,
            CapabilitySet::single(Capability::General),
            1,
        );
        let err = registry
            .call(&model, &call_for("ghost"), &CancellationToken::new(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, OrchestratorError::ModelNotFound("ghost".to_string()));
    }
}
