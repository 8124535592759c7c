//! Model descriptors and the provider-agnostic call/response shapes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capability::CapabilitySet;
use crate::conversation::{ConversationEntry, MessageRole};

/// Where a model runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Local,
    Remote,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Local => write!(f, "local"),
            ModelKind::Remote => write!(f, "remote"),
        }
    }
}

/// A model as listed by its provider. Produced on demand, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub provider_name: String,
    pub kind: ModelKind,
    pub capabilities: CapabilitySet,
    pub context_length: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_per_token: Option<f64>,
}

impl ModelDescriptor {
    pub fn new(
        name: impl Into<String>,
        provider_name: impl Into<String>,
        kind: ModelKind,
        capabilities: CapabilitySet,
        context_length: u32,
    ) -> Self {
        Self {
            name: name.into(),
            provider_name: provider_name.into(),
            kind,
            capabilities,
            context_length,
            cost_per_token: None,
        }
    }

    pub fn with_cost_per_token(mut self, cost: f64) -> Self {
        self.cost_per_token = Some(cost);
        self
    }
}

/// A message in a model call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ConversationEntry> for ChatMessage {
    fn from(entry: &ConversationEntry) -> Self {
        Self {
            role: entry.role,
            content: entry.content.clone(),
        }
    }
}

/// Normalized model call handed to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCall {
    /// Name of the selected model.
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(default)]
    pub streaming: bool,
}

impl ModelCall {
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
    }

    /// The last user message, normally the request content.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
    }
}

/// Normalized provider response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub content: String,
    /// Token usage if the provider reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u64>,
}

impl ModelOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            token_count: None,
        }
    }

    pub fn with_token_count(mut self, tokens: u64) -> Self {
        self.token_count = Some(tokens);
        self
    }

    /// Reported token count, or a whitespace word count when absent.
    pub fn effective_token_count(&self) -> u64 {
        self.token_count
            .unwrap_or_else(|| self.content.split_whitespace().count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capability;

    #[test]
    fn test_call_accessors() {
        let call = ModelCall {
            model: "codellama".to_string(),
            messages: vec![
                ChatMessage::system("You debug code."),
                ChatMessage::user("earlier"),
                ChatMessage::assistant("answer"),
                ChatMessage::user("fix null pointer"),
            ],
            temperature: 0.2,
            max_tokens: 2048,
            streaming: false,
        };
        assert_eq!(call.system_prompt(), Some("You debug code."));
        assert_eq!(call.last_user_message(), Some("fix null pointer"));
    }

    #[test]
    fn test_effective_token_count() {
        assert_eq!(ModelOutput::text("one two  three").effective_token_count(), 3);
        assert_eq!(
            ModelOutput::text("ignored").with_token_count(42).effective_token_count(),
            42
        );
    }

    #[test]
    fn test_descriptor_serde() {
        let descriptor = ModelDescriptor::new(
            "codellama",
            "local",
            ModelKind::Local,
            CapabilitySet::new([Capability::Debug, Capability::Code]).unwrap(),
            16_384,
        );
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["kind"], "local");
        assert!(json.get("cost_per_token").is_none());
    }
}
