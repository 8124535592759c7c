//! Mock model provider.

use async_trait::async_trait;
use maestro_core::{Capability, CapabilitySet, ModelCall, ModelDescriptor, ModelKind, ModelOutput};
use maestro_models::{ModelProvider, ProviderError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A provider with scripted models and replies.
///
/// Without a scripted reply it echoes the last user message, prefixed with
/// the model name. Clones share the call log.
#[derive(Debug, Clone)]
pub struct MockProvider {
    name: String,
    kind: ModelKind,
    models: Vec<ModelDescriptor>,
    reply: Option<String>,
    token_count: Option<u64>,
    failure: Option<ProviderError>,
    list_failure: Option<ProviderError>,
    available: bool,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<ModelCall>>>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ModelKind::Local,
            models: Vec::new(),
            reply: None,
            token_count: None,
            failure: None,
            list_failure: None,
            available: true,
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the provider kind. Affects models added afterwards.
    pub fn with_kind(mut self, kind: ModelKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_model(mut self, model: ModelDescriptor) -> Self {
        self.models.push(model);
        self
    }

    /// Add a general-purpose model served by this provider.
    pub fn with_model_named(self, name: impl Into<String>) -> Self {
        let descriptor = ModelDescriptor::new(
            name,
            self.name.clone(),
            self.kind,
            CapabilitySet::single(Capability::General),
            8_192,
        );
        self.with_model(descriptor)
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// Report a token count with every reply.
    pub fn with_token_count(mut self, count: u64) -> Self {
        self.token_count = Some(count);
        self
    }

    /// Fail every invocation with `error`.
    pub fn with_failure(mut self, error: ProviderError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Fail model listing with `error`.
    pub fn with_list_failure(mut self, error: ProviderError) -> Self {
        self.list_failure = Some(error);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<ModelCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn last_call(&self) -> Option<ModelCall> {
        lock(&self.calls).last().cloned()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ModelKind {
        self.kind
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ProviderError> {
        match &self.list_failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.models.clone()),
        }
    }

    async fn invoke(&self, call: &ModelCall) -> Result<ModelOutput, ProviderError> {
        lock(&self.calls).push(call.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if !self.models.iter().any(|m| m.name == call.model) {
            return Err(ProviderError::UnknownModel(call.model.clone()));
        }

        let content = match &self.reply {
            Some(reply) => reply.clone(),
            None => format!(
                "[{}] {}",
                call.model,
                call.last_user_message().unwrap_or_default()
            ),
        };
        let output = ModelOutput::text(content);
        Ok(match self.token_count {
            Some(count) => output.with_token_count(count),
            None => output,
        })
    }
}
