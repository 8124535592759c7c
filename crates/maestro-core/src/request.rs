//! Request values submitted to the orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::identifiers::RequestId;

/// The kind of work a request asks for.
///
/// The kind drives model preference, tool eligibility and the prompt
/// template used for the model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Chat,
    Command,
    Analysis,
    Refactor,
    Debug,
    Test,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Chat => "chat",
            RequestKind::Command => "command",
            RequestKind::Analysis => "analysis",
            RequestKind::Refactor => "refactor",
            RequestKind::Debug => "debug",
            RequestKind::Test => "test",
        }
    }

    pub fn all() -> &'static [RequestKind] {
        &[
            RequestKind::Chat,
            RequestKind::Command,
            RequestKind::Analysis,
            RequestKind::Refactor,
            RequestKind::Debug,
            RequestKind::Test,
        ]
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown request kind: {0}")]
pub struct UnknownRequestKind(pub String);

impl FromStr for RequestKind {
    type Err = UnknownRequestKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        RequestKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| UnknownRequestKind(s.to_string()))
    }
}

/// Editor/workspace context attached to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Caller-supplied execution options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_provider: Option<String>,
    #[serde(default)]
    pub streaming: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_millis: Option<u64>,
}

/// A single unit of work. Never mutated after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub kind: RequestKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<RequestContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<RequestOptions>,
}

impl Request {
    /// Create a request with no context or options.
    pub fn new(id: RequestId, kind: RequestKind, content: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            content: content.into(),
            context: None,
            options: None,
        }
    }

    pub fn builder(kind: RequestKind, content: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            id: None,
            kind,
            content: content.into(),
            context: None,
            options: None,
        }
    }

    pub fn preferred_model(&self) -> Option<&str> {
        self.options.as_ref()?.preferred_model.as_deref()
    }

    pub fn preferred_provider(&self) -> Option<&str> {
        self.options.as_ref()?.preferred_provider.as_deref()
    }

    pub fn timeout_millis(&self) -> Option<u64> {
        self.options.as_ref()?.timeout_millis
    }

    pub fn workspace_root(&self) -> Option<&str> {
        self.context.as_ref()?.workspace_root.as_deref()
    }
}

/// Builder for [`Request`]; generates an ID when none is given.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    id: Option<RequestId>,
    kind: RequestKind,
    content: String,
    context: Option<RequestContext>,
    options: Option<RequestOptions>,
}

impl RequestBuilder {
    pub fn id(mut self, id: RequestId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn file_path(mut self, path: impl Into<String>) -> Self {
        self.context.get_or_insert_with(Default::default).file_path = Some(path.into());
        self
    }

    pub fn workspace_root(mut self, root: impl Into<String>) -> Self {
        self.context
            .get_or_insert_with(Default::default)
            .workspace_root = Some(root.into());
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn preferred_model(mut self, model: impl Into<String>) -> Self {
        self.options
            .get_or_insert_with(Default::default)
            .preferred_model = Some(model.into());
        self
    }

    pub fn preferred_provider(mut self, provider: impl Into<String>) -> Self {
        self.options
            .get_or_insert_with(Default::default)
            .preferred_provider = Some(provider.into());
        self
    }

    pub fn timeout_millis(mut self, timeout: u64) -> Self {
        self.options
            .get_or_insert_with(Default::default)
            .timeout_millis = Some(timeout);
        self
    }

    pub fn build(self) -> Request {
        Request {
            id: self.id.unwrap_or_else(RequestId::generate),
            kind: self.kind,
            content: self.content,
            context: self.context,
            options: self.options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_and_display() {
        for kind in RequestKind::all() {
            assert_eq!(kind.to_string().parse::<RequestKind>().unwrap(), *kind);
        }
        assert_eq!("DEBUG".parse::<RequestKind>().unwrap(), RequestKind::Debug);
        assert!("deploy".parse::<RequestKind>().is_err());
    }

    #[test]
    fn test_builder_accessors() {
        let request = Request::builder(RequestKind::Refactor, "extract function")
            .id(RequestId::parse("r7").unwrap())
            .preferred_model("gpt-4o")
            .timeout_millis(5_000)
            .workspace_root("/tmp/ws")
            .build();

        assert_eq!(request.id.as_str(), "r7");
        assert_eq!(request.preferred_model(), Some("gpt-4o"));
        assert_eq!(request.preferred_provider(), None);
        assert_eq!(request.timeout_millis(), Some(5_000));
        assert_eq!(request.workspace_root(), Some("/tmp/ws"));
    }

    #[test]
    fn test_builder_generates_id() {
        let request = Request::builder(RequestKind::Chat, "hi").build();
        assert!(!request.id.as_str().is_empty());
        assert!(request.options.is_none());
    }

    #[test]
    fn test_deserialize_minimal() {
        let request: Request =
            serde_json::from_str(r#"{"id":"r1","kind":"debug","content":"fix null pointer"}"#)
                .unwrap();
        assert_eq!(request.kind, RequestKind::Debug);
        assert!(request.context.is_none());
    }
}
