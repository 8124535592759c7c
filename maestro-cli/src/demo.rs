use async_trait::async_trait;
use maestro_core::{Capability, CapabilitySet, ModelCall, ModelDescriptor, ModelKind, ModelOutput};
use maestro_models::{ModelProvider, ProviderError};

/// Local provider that answers by restating the prompt.
///
/// Stands in for a real backend so the CLI can run a full request offline.
pub struct EchoProvider {
    models: Vec<ModelDescriptor>,
}

impl EchoProvider {
    pub const NAME: &'static str = "local";

    pub fn new() -> Self {
        let code = CapabilitySet::new([
            Capability::Code,
            Capability::Debug,
            Capability::Refactor,
            Capability::Test,
        ])
        .unwrap_or_else(|_| CapabilitySet::single(Capability::Code));

        Self {
            models: vec![
                ModelDescriptor::new("codellama", Self::NAME, ModelKind::Local, code, 16_384),
                ModelDescriptor::new(
                    "llama3",
                    Self::NAME,
                    ModelKind::Local,
                    CapabilitySet::single(Capability::Chat),
                    8_192,
                ),
            ],
        }
    }
}

#[async_trait]
impl ModelProvider for EchoProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Local
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ProviderError> {
        Ok(self.models.clone())
    }

    async fn invoke(&self, call: &ModelCall) -> Result<ModelOutput, ProviderError> {
        if !self.models.iter().any(|m| m.name == call.model) {
            return Err(ProviderError::UnknownModel(call.model.clone()));
        }

        let prompt = call.last_user_message().unwrap_or_default();
        let context_lines = call
            .system_prompt()
            .map(|s| s.lines().filter(|l| l.starts_with("- [")).count())
            .unwrap_or(0);

        Ok(ModelOutput::text(format!(
            "{} received: {} ({} context snippets, {} prior messages)",
            call.model,
            prompt,
            context_lines,
            call.messages.len().saturating_sub(2)
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::ChatMessage;

    #[tokio::test]
    async fn test_echoes_prompt() {
        let provider = EchoProvider::new();
        let call = ModelCall {
            model: "codellama".to_string(),
            messages: vec![
                ChatMessage::system("Debug.\n\nRelevant context:\n- [notes] a\n- [notes] b"),
                ChatMessage::user("fix null pointer"),
            ],
            temperature: 0.1,
            max_tokens: 128,
            streaming: false,
        };

        let output = provider.invoke(&call).await.unwrap();
        assert_eq!(
            output.content,
            "codellama received: fix null pointer (2 context snippets, 0 prior messages)"
        );
    }

    #[tokio::test]
    async fn test_unknown_model() {
        let call = ModelCall {
            model: "gpt-4o".to_string(),
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.7,
            max_tokens: 128,
            streaming: false,
        };
        assert!(EchoProvider::new().invoke(&call).await.is_err());
    }
}
